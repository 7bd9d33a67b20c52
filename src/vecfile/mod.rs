// src/vecfile/mod.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Vector declaration line: keyword, index, quoted module path, then the
/// rest of the line holding the quoted label. The tail is captured whole
/// because labels may contain whitespace.
static DECL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+)\s+(\S+)\s+(\S+)\s+(\S.*)$").expect("declaration regex"));

/// One vector declaration out of a `.vec` file header line.
#[derive(Debug)]
struct VectorDecl {
    index: String,
    module: String,
    label: String,
}

/// Parse every declaration line of a `.vec` file. Data rows (leading
/// digit) and blank lines are skipped; they belong to the engine's
/// extraction pass, not to label reading.
fn read_decls(path: &Path) -> Result<Vec<VectorDecl>> {
    let file =
        File::open(path).with_context(|| format!("opening vector file {}", path.display()))?;
    let mut decls = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("reading vector file {}", path.display()))?;
        let lineno = lineno + 1;
        if line.is_empty() || line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let caps = match DECL_LINE.captures(&line) {
            Some(caps) => caps,
            None => bail!(
                "malformed vector declaration at {}:{}: {:?}",
                path.display(),
                lineno,
                line
            ),
        };
        // The label is the text between the first pair of quotes in the
        // tail; anything after the closing quote is ignored.
        let label = match caps[4].splitn(3, '"').nth(1) {
            Some(label) => label.to_string(),
            None => bail!(
                "vector declaration without a quoted label at {}:{}: {:?}",
                path.display(),
                lineno,
                line
            ),
        };
        decls.push(VectorDecl {
            index: caps[2].to_string(),
            module: caps[3].to_string(),
            label,
        });
    }
    debug!(
        "{} vector declarations in {}",
        decls.len(),
        path.display()
    );
    Ok(decls)
}

/// Index → label map for a `.vec` file.
///
/// When a declaration's label matches one already mapped, the new entry
/// is disambiguated with the last dot-segment of its module path.
/// Earlier entries keep their plain labels.
pub fn read_labels(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut labels: BTreeMap<String, String> = BTreeMap::new();
    for decl in read_decls(path)? {
        let label = if labels.values().any(|seen| *seen == decl.label) {
            let segment = decl
                .module
                .rsplit('.')
                .next()
                .unwrap_or(&decl.module)
                .trim_matches('"');
            format!("{}.{}", segment, decl.label)
        } else {
            decl.label
        };
        labels.insert(decl.index, label);
    }
    Ok(labels)
}

/// Index → `label.index` map for a `.vec` file. The unconditional suffix
/// keeps frame names unique even when labels repeat across modules.
pub fn read_labels_suffixed(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    for decl in read_decls(path)? {
        let suffixed = format!("{}.{}", decl.label, decl.index);
        labels.insert(decl.index, suffixed);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const PLAIN_VEC: &str = "\
vector 3  \"saitEHCalNet.mn.networkLayer.proc.ICMP.nd\"  \"Movement Detection Latency\"  1
3 143.61245 143.61245
vector 6  \"saitEHCalNet.mn.linkLayers[0].networkInterface\"  \"IEEE 802.11 HO Latency\"  1
6 143.627909  0.253460132
vector 5  \"saitEHCalNet.mn.networkLayer.proc.mobility\"  \"handoverLatency\"  1
5 143.714402  0.339952951
vector 0  \"saitEHCalNet.mn.networkLayer.proc.ICMP.icmpv6Core\"  \"pingEED\"  1
0 155.000993  0.0109926666
0 155.010813  0.010812523
0 155.020673  0.010672523
";

    const DUPLICATE_VEC: &str = "\
vector 3  \"saitEHCalNet.mn.networkLayer.proc.ICMP.nd\"  \"Movement Detection Latency\"  1
3 143.61245 143.61245
vector 6  \"saitEHCalNet.mn.linkLayers[0].networkInterface\"  \"IEEE 802.11 HO Latency\"  1
6 143.627909  0.253460132
vector 5  \"saitEHCalNet.mn.networkLayer.proc.mobility\"  \"handoverLatency\"  1
5 143.714402  0.339952951
vector 0  \"saitEHCalNet.mn.networkLayer.proc.ICMP.icmpv6Core\"  \"pingEED\"  1
0 155.000993  0.0109926666
vector 2  \"saitEHCalNet.mn.networkLayer.proc.ICMP.icmpv6Core\"  \"handoverLatency\"  1
2 265.010862  1.19022885
vector 1  \"saitEHCalNet.mn.networkLayer.proc.ICMP.duddup\"  \"handoverLatency\"  1
";

    fn write_vec(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn entries(map: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
        map.iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn read_labels_keeps_plain_labels_without_collisions() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "test.vec", PLAIN_VEC);
        let labels = read_labels(&path).unwrap();
        assert_eq!(
            entries(&labels),
            vec![
                ("0", "pingEED"),
                ("3", "Movement Detection Latency"),
                ("5", "handoverLatency"),
                ("6", "IEEE 802.11 HO Latency"),
            ]
        );
    }

    #[test]
    fn read_labels_disambiguates_repeated_labels_by_module_segment() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "test.vec", DUPLICATE_VEC);
        let labels = read_labels(&path).unwrap();
        assert_eq!(
            entries(&labels),
            vec![
                ("0", "pingEED"),
                ("1", "duddup.handoverLatency"),
                ("2", "icmpv6Core.handoverLatency"),
                ("3", "Movement Detection Latency"),
                ("5", "handoverLatency"),
                ("6", "IEEE 802.11 HO Latency"),
            ]
        );
    }

    #[test]
    fn read_labels_suffixed_appends_the_index_unconditionally() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "test.vec", DUPLICATE_VEC);
        let labels = read_labels_suffixed(&path).unwrap();
        assert_eq!(
            entries(&labels),
            vec![
                ("0", "pingEED.0"),
                ("1", "handoverLatency.1"),
                ("2", "handoverLatency.2"),
                ("3", "Movement Detection Latency.3"),
                ("5", "handoverLatency.5"),
                ("6", "IEEE 802.11 HO Latency.6"),
            ]
        );
    }

    #[test]
    fn data_rows_and_blank_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let contents = format!("{}\n\n0 155.070613  0.010612523\n", PLAIN_VEC);
        let path = write_vec(&dir, "test.vec", &contents);
        let labels = read_labels(&path).unwrap();
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn empty_file_yields_no_labels() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "empty.vec", "");
        assert!(read_labels(&path).unwrap().is_empty());
        assert!(read_labels_suffixed(&path).unwrap().is_empty());
    }

    #[test]
    fn truncated_declaration_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "bad.vec", "vector 9\n");
        let err = read_labels(&path).unwrap_err();
        assert!(err.to_string().contains("malformed vector declaration"));
        assert!(err.to_string().contains("bad.vec:1"));
    }

    #[test]
    fn unquoted_label_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_vec(&dir, "bad.vec", "vector 9  \"net.mod\"  nolabel  1\n");
        let err = read_labels(&path).unwrap_err();
        assert!(err.to_string().contains("without a quoted label"));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = read_labels(Path::new("/nonexistent/never.vec")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/never.vec"));
    }
}
