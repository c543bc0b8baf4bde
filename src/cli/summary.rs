//! End-of-run summary

use chart_image_mirror::domain::{AppliedOverride, RegistryTarget};
use console::style;
use std::io::{self, Write};

pub fn print_summary(applied: &[AppliedOverride], target: &RegistryTarget) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(&mut out, applied, target)
}

fn write_summary<W: Write>(
    out: &mut W,
    applied: &[AppliedOverride],
    target: &RegistryTarget,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style("=== Update Summary ===").blue())?;
    writeln!(out, "{}", style("✓ Updated Helm values.yaml files with ECR image references").green())?;
    writeln!(out)?;

    if applied.is_empty() {
        writeln!(out, "No images were updated.")?;
    } else {
        writeln!(out, "Updated images:")?;
        for image in applied {
            writeln!(out, "  • {}", image)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Target ECR configuration:")?;
    writeln!(out, "  • Region: {}", target.region)?;
    writeln!(out, "  • Account ID: {}", target.account_id)?;
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        style("Note: Image overrides have been added to the top-level values.yaml file.").yellow()
    )?;
    writeln!(out, "      These overrides will be used by all subcharts during deployment.")?;
    writeln!(out)?;
    writeln!(out, "{}", style("Next steps:").blue())?;
    writeln!(out, "  1. Review the updated values.yaml files")?;
    writeln!(out, "  2. Run 'helm dependency update' to update external chart dependencies")?;
    writeln!(out, "  3. Deploy with 'helm install' or 'helm upgrade'")?;
    Ok(())
}
