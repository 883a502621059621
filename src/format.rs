//! Renders a proof tree as a human-readable, indented text listing.
//!
//! Purely a presentation layer: it never touches the network or a hash
//! oracle, and it never fails — any tree that parsed is formattable.

use crate::attestation::Attestation;
use crate::timestamp::{OtsFile, Timestamp};

/// Stateless tree-to-text renderer.
pub struct Formatter;

impl Formatter {
    /// Render `file`'s hash algorithm, file digest and full proof tree.
    pub fn format(file: &OtsFile) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "File hash: {} ({})\n",
            hex::encode(&file.file_digest),
            file.hash_algorithm.name()
        ));
        Self::write_node(&mut out, &file.timestamp, "", true);
        out
    }

    /// Render a standalone [`Timestamp`] with no file header.
    pub fn format_timestamp(timestamp: &Timestamp) -> String {
        let mut out = String::new();
        Self::write_node(&mut out, timestamp, "", true);
        out
    }

    fn write_node(out: &mut String, node: &Timestamp, prefix: &str, _is_root: bool) {
        let branch_count = node.attestations.len() + node.operations.len();
        let mut index = 0;

        for attestation in &node.attestations {
            let is_last = index == branch_count - 1;
            Self::write_attestation_line(out, attestation, prefix, is_last);
            index += 1;
        }

        for (op, child) in &node.operations {
            let is_last = index == branch_count - 1;
            let glyph = if is_last { "\u{2514}\u{2500} " } else { "\u{251c}\u{2500} " };
            out.push_str(prefix);
            out.push_str(glyph);
            out.push_str(&op.label());
            out.push('\n');

            let child_prefix = format!(
                "{prefix}{}",
                if is_last { "    " } else { "\u{2502}   " }
            );
            Self::write_node(out, child, &child_prefix, false);
            index += 1;
        }
    }

    fn write_attestation_line(
        out: &mut String,
        attestation: &Attestation,
        prefix: &str,
        is_last: bool,
    ) {
        let glyph = if is_last { "\u{2514}\u{2500} " } else { "\u{251c}\u{2500} " };
        out.push_str(prefix);
        out.push_str(glyph);
        out.push_str(&describe_attestation(attestation));
        out.push('\n');
    }
}

fn describe_attestation(attestation: &Attestation) -> String {
    match attestation {
        Attestation::Bitcoin { height } => format!("Bitcoin block {height} attestation"),
        Attestation::Litecoin { height } => format!("Litecoin block {height} attestation"),
        Attestation::Ethereum { height } => format!("Ethereum block {height} attestation"),
        Attestation::Pending { uri } => format!("pending confirmation in {uri}"),
        Attestation::Unknown { tag, .. } => {
            format!("unknown attestation (tag {})", hex::encode(tag))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{HashAlgorithm, Operation};

    #[test]
    fn formats_single_attestation() {
        let file = OtsFile {
            hash_algorithm: HashAlgorithm::Sha256,
            file_digest: vec![0xab; 4],
            timestamp: Timestamp::with_attestation(Attestation::Bitcoin { height: 500_000 }),
        };
        let rendered = Formatter::format(&file);
        assert!(rendered.contains("Bitcoin block 500000 attestation"));
        assert!(rendered.contains("abababab"));
    }

    #[test]
    fn formats_operation_chain_with_indentation() {
        let leaf = Timestamp::with_attestation(Attestation::Pending {
            uri: "https://alice.btc.calendar.opentimestamps.org".to_string(),
        });
        let root = Timestamp {
            attestations: vec![],
            operations: vec![(Operation::Sha256, leaf)],
        };
        let rendered = Formatter::format_timestamp(&root);
        assert!(rendered.contains("SHA256"));
        assert!(rendered.contains("pending confirmation in"));
    }

    #[test]
    fn formats_fork_with_both_branches() {
        let root = Timestamp {
            attestations: vec![Attestation::Bitcoin { height: 1 }],
            operations: vec![(Operation::Reverse, Timestamp::with_attestation(Attestation::Bitcoin { height: 2 }))],
        };
        let rendered = Formatter::format_timestamp(&root);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
    }
}
