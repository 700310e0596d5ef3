use crate::batch::BatchReport;
use crate::pipeline::Job;
use console::style;
use dialoguer::Confirm;
use std::path::Path;

/// Show the planned jobs and ask whether to run them.
pub fn confirm_jobs(jobs: &[Job]) -> anyhow::Result<bool> {
    print_jobs(jobs);

    let proceed = Confirm::new()
        .with_prompt("Convert the files above?")
        .default(true)
        .interact()?;

    println!();
    Ok(proceed)
}

fn print_jobs(jobs: &[Job]) {
    let rows: Vec<[String; 3]> = jobs
        .iter()
        .map(|job| {
            [
                display_name(&job.media_file),
                display_name(&job.subtitle_file),
                job.output_file.display().to_string(),
            ]
        })
        .collect();

    let headers = ["Media File", "Subtitle File", "Output File"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    println!();
    println!(
        "  {:<w0$}  {:<w1$}  {}",
        style(headers[0]).bold(),
        style(headers[1]).bold(),
        style(headers[2]).bold(),
        w0 = widths[0],
        w1 = widths[1],
    );
    for row in &rows {
        println!(
            "  {:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            style(&row[2]).cyan(),
            w0 = widths[0],
            w1 = widths[1],
        );
    }
    println!();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print a summary of the batch results.
pub fn print_summary(report: &BatchReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                      Conversion Complete                      ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => println!(
                "  {} {} ({} subtitles, {} segments, {:.1}s of audio{}, {:.1}s)",
                style("✓").green(),
                summary.output_path.display(),
                summary.subtitle_entries,
                summary.segments,
                summary.audio_secs,
                if summary.tagged { ", tagged" } else { "" },
                summary.elapsed.as_secs_f64()
            ),
            Err(e) => println!(
                "  {} {}: {}",
                style("✗").red(),
                outcome.job.media_file.display(),
                e
            ),
        }
    }

    println!();
    println!(
        "  Succeeded:  {}",
        style(report.succeeded()).green()
    );
    if report.failed() > 0 {
        println!("  Failed:     {}", style(report.failed()).red());
    }
    if report.skipped > 0 {
        println!("  Skipped:    {}", style(report.skipped).yellow());
    }
    if report.cancelled {
        println!("  {}", style("Cancelled by user").yellow());
    }
    println!(
        "  Total:      {:.2}s",
        report.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/a/b/Ep 1.mkv")), "Ep 1.mkv");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
