//! Comma-separated dump of an analysis tree.

use crate::{
    error::{Error, Result},
    tree::{walk, AnalysisNode, Visit},
};
use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Result as IoResult, Write},
    path::Path,
};
use tracing::info;

const COLUMNS: &str = "Type,Path,Name,Duration(ms),Source,Index,Encoding,Container,Channels,Bits,\
                       LoopStart,LoopEnd,Mode,GUID";

/// Writes one row per node of `roots`, in document order, after a header row.
///
/// Returns the number of node rows written.
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(roots: &[AnalysisNode], out: &mut W) -> IoResult<usize> {
    writeln!(out, "{COLUMNS}")?;

    let mut rows = 0;
    for visit in walk(roots) {
        let line = row(&visit)
            .iter()
            .map(|field| quote(field))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
        rows += 1;
    }

    Ok(rows)
}

/// Writes the dump of `roots` to the file at `path`.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn export_csv(roots: &[AnalysisNode], path: &Path) -> Result<usize> {
    let file = File::create(path).map_err(Error::io(path))?;
    let mut out = BufWriter::new(file);

    let rows = write_csv(roots, &mut out).map_err(Error::io(path))?;
    out.flush().map_err(Error::io(path))?;

    info!(path = %path.display(), rows, "wrote csv export");
    Ok(rows)
}

fn row(visit: &Visit<'_>) -> [String; 14] {
    let node = visit.node;
    let mut fields: [String; 14] = Default::default();
    fields[0] = node.kind_label().to_owned();
    fields[1] = visit.display_path();
    fields[2] = node.name().to_owned();

    match node {
        AnalysisNode::FileRoot(root) => fields[4] = root.path.display().to_string(),
        AnalysisNode::ContainerGroup(group) => fields[4] = group.location.to_string(),
        AnalysisNode::EventGroup(_) => {}
        AnalysisNode::Event(event) => {
            fields[3] = event.info.length_ms.map(|ms| ms.to_string()).unwrap_or_default();
            fields[13] = event.info.guid.map(|guid| guid.to_string()).unwrap_or_default();
        }
        AnalysisNode::SubSoundLeaf(leaf) => {
            let sound = &leaf.descriptor;
            fields[3] = sound.length_ms.to_string();
            fields[4] = sound.location.to_string();
            fields[5] = sound.index.to_string();
            fields[6] = sound.encoding.to_string();
            fields[7] = sound.container_format.to_string();
            fields[8] = sound.channels.to_string();
            fields[9] = sound.effective_bits().to_string();
            fields[10] = sound.loop_start_ms.to_string();
            fields[11] = sound.loop_end_ms.to_string();
            fields[12] = sound.mode.to_string();
        }
    }

    fields
}

fn quote(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod test {
    use super::{quote, write_csv};
    use crate::{
        model::{EventInfo, Guid},
        tree::{
            test::{container, leaf, root},
            AnalysisNode, EventGroup, EventNode,
        },
    };

    #[test]
    fn quote_only_when_needed() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn one_row_per_node() {
        let events = AnalysisNode::EventGroup(EventGroup {
            name: "Events".to_owned(),
            selected: false,
            children: vec![AnalysisNode::Event(EventNode {
                info: EventInfo {
                    path: "event:/music/title".to_owned(),
                    guid: Some(Guid([0; 16])),
                    length_ms: Some(2500),
                },
                selected: false,
            })],
        });
        let roots = vec![root(
            "music.bank",
            vec![events, container("a,b.fsb", vec![leaf("intro", 3)])],
        )];

        let mut out = Vec::new();
        let rows = write_csv(&roots, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(rows, 5);
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Type,Path,Name,Duration(ms),Source,Index"));
        assert!(lines[0].ends_with("LoopEnd,Mode,GUID"));
        assert_eq!(lines[1], "File,music.bank,music.bank,,music.bank,,,,,,,,,");
        assert_eq!(
            lines[3],
            "Event,music.bank/Events/event:/music/title,event:/music/title,2500,,,,,,,,,,\
             {00000000-0000-0000-0000-000000000000}"
        );
        assert!(lines[4].starts_with("Container,\"music.bank/a,b.fsb\",\"a,b.fsb\","));
        assert_eq!(
            lines[5],
            "SubSound,\"music.bank/a,b.fsb/intro\",intro,10,bank.bank@0x00000040,3,\
             \"PCM (16-bit, integer)\",FSB5,1,16,0,0,LOOP_OFF,"
        );
    }
}
