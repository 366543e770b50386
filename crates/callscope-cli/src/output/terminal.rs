//! Terminal output formatter

use callscope_core::{Evidence, RepoIndex, Resolution, RunOutput, UsageHit};
use std::io::{self, Write};
use termcolor::{Color, ColorSpec, WriteColor};

fn heading(out: &mut impl WriteColor, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "{}", text)?;
    out.reset()
}

fn label(out: &mut impl WriteColor, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()
}

pub fn write_run(out: &mut impl WriteColor, run: &RunOutput) -> io::Result<()> {
    write!(out, "{}", run.document)?;
    writeln!(out)?;
    if let Some(artifacts) = &run.artifacts {
        label(out, Color::Green, "wrote")?;
        writeln!(out, " {}", artifacts.explanation.display())?;
        label(out, Color::Green, "wrote")?;
        writeln!(out, " {}", artifacts.blackboard.display())?;
        if let Some(run_log) = &artifacts.run_log {
            label(out, Color::Green, "wrote")?;
            writeln!(out, " {}", run_log.display())?;
        }
    }
    if run.fallback {
        label(out, Color::Yellow, "note")?;
        writeln!(out, ": explanation assembled from raw evidence ({})", run.stop_reason)?;
    }
    Ok(())
}

pub fn write_index(out: &mut impl WriteColor, index: &RepoIndex, list_symbols: bool) -> io::Result<()> {
    let stats = index.stats();
    heading(out, &format!("Index of {}", index.root().display()))?;
    writeln!(out, "Files:           {}", stats.files)?;
    writeln!(out, "Symbols:         {}", stats.symbols)?;
    writeln!(out, "  Functions:     {}", stats.functions)?;
    writeln!(out, "  Methods:       {}", stats.methods)?;
    writeln!(out, "  Classes:       {}", stats.classes)?;
    writeln!(out, "Skipped:         {}", stats.skipped)?;

    for skipped in index.skipped_files() {
        label(out, Color::Yellow, "  skipped")?;
        writeln!(out, " {}: {}", skipped.path, skipped.reason)?;
    }

    if list_symbols {
        writeln!(out)?;
        for def in index.symbols().values() {
            writeln!(
                out,
                "{:<8} {} ({}:{}-{})",
                def.kind.as_str(), def.qualified_name, def.file_path, def.line_start, def.line_end
            )?;
        }
    }
    Ok(())
}

pub fn write_resolution(
    out: &mut impl WriteColor,
    query: &str,
    resolution: &Resolution,
    evidence: Option<&Evidence>,
) -> io::Result<()> {
    match resolution {
        Resolution::Matched { symbol, strategy } => {
            label(out, Color::Green, "matched")?;
            writeln!(
                out,
                " {} -> {} ({}:{}-{}) via {}",
                query,
                symbol.qualified_name,
                symbol.file_path,
                symbol.line_start,
                symbol.line_end,
                strategy
            )?;
        }
        Resolution::Ambiguous { candidates } => {
            label(out, Color::Yellow, "ambiguous")?;
            writeln!(out, " {}: {} candidates", query, candidates.len())?;
            for candidate in candidates {
                writeln!(out, "  {}", candidate)?;
            }
        }
        Resolution::NotFound => {
            label(out, Color::Red, "not found")?;
            writeln!(out, " {}", query)?;
        }
    }

    if let Some(evidence) = evidence {
        writeln!(out)?;
        writeln!(out, "{}", evidence.snippet.trim_end())?;
        if !evidence.calls.is_empty() {
            writeln!(out)?;
            writeln!(out, "Calls: {}", evidence.calls.join(", "))?;
        }
    }
    Ok(())
}

pub fn write_usages(out: &mut impl WriteColor, needle: &str, hits: &[UsageHit]) -> io::Result<()> {
    if hits.is_empty() {
        writeln!(out, "No usages of {}", needle)?;
        return Ok(());
    }
    for hit in hits {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "{}:{}", hit.file, hit.line)?;
        out.reset()?;
        writeln!(out, ": {}", hit.text.trim())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    #[test]
    fn test_usages_plain_rendering() {
        let hits = vec![UsageHit {
            file: "b.py".to_string(),
            line: 2,
            text: "    return helper()".to_string(),
        }];
        let mut out = NoColor::new(Vec::new());
        write_usages(&mut out, "helper", &hits).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(text, "b.py:2: return helper()\n");
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let resolution = Resolution::Ambiguous {
            candidates: vec!["a.normalize".to_string(), "b.normalize".to_string()],
        };
        let mut out = NoColor::new(Vec::new());
        write_resolution(&mut out, "normalize", &resolution, None).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(
            text,
            "ambiguous normalize: 2 candidates\n  a.normalize\n  b.normalize\n"
        );
    }
}
