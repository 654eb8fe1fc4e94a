//! 运行结果摘要.

use std::io::{self, Write};

use hetero_berry::prelude::*;

/// 将 `report` 的摘要写进 `w` 中.
pub fn describe_into<W: Write>(report: &SampleReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    let b = &report.bounds;
    writeln!(w, "Sample `{}`:", report.sample)?;
    writeln!(
        w,
        "{S4}Bounds: z [{}, {}), x [{}, {}), y [{}, {})",
        b.z_ini, b.z_fin, b.x_ini, b.x_fin, b.y_ini, b.y_fin
    )?;
    writeln!(
        w,
        "{S4}Voidmean: {}, rockmedian: {}",
        f64_to_display(report.reference.map(|r| r.voidmean())),
        f64_to_display(report.reference.map(|r| r.rockmedian()))
    )?;
    writeln!(w, "{S4}Subcube feature rows: {}", report.features.len())?;
    writeln!(w, "{S4}Entropy records: {}", report.entropy.len())?;
    for f in report.skipped.iter() {
        writeln!(w, "{S4}Skipped {}: {}", f.key, f.error)?;
    }
    for r in report.ranks.iter() {
        let ranks: Vec<String> = r
            .ranks
            .iter()
            .map(|(f, v)| format!("{f} {v:.1}"))
            .collect();
        writeln!(
            w,
            "{S4}Rank (division {}, contrast_adjustment {}): {}",
            r.division,
            r.contrast_adjustment,
            ranks.join(", ")
        )?;
    }
    for (stage, d) in report.timings.iter() {
        writeln!(w, "{S4}Stage {stage}: {:.3} s", d.as_secs_f64())?;
    }
    write!(
        w,
        "{S4}Total time: {:.3} s",
        report.timings.total().as_secs_f64()
    )?;
    Ok(())
}

/// 打印摘要.
pub fn print(report: &SampleReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    utils::sep_to(&mut lock)?;
    describe_into(report, &mut lock)?;
    writeln!(lock)?;
    utils::sep_to(&mut lock)
}
