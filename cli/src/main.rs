//! Batch front end for the `chembal` balancer.
//!
//! Takes equations from the command line and/or a line-delimited text file,
//! balances and verifies each one, prints a result table and can write the
//! same table as CSV.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chembal::{balance, verify};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "chembal",
    about = "Balance chemical equations with exact integer coefficients",
    version
)]
struct Cli {
    /// Equations given directly on the command line, e.g. "H2 + O2 -> H2O"
    #[arg(value_name = "EQUATION")]
    equations: Vec<String>,

    /// Read additional equations from a line-delimited text file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Write the result table as CSV to the given path
    #[arg(long, value_name = "FILE")]
    csv: Option<PathBuf>,
}

/// One row of the result table.
struct Row {
    original: String,
    balanced: String,
    status: &'static str,
}

fn process(equation: &str) -> Row {
    match balance(equation) {
        Ok(balanced) => {
            let rendered = balanced.to_string();
            let status = if verify(&rendered).is_balanced {
                "balanced"
            } else {
                "unbalanced"
            };
            Row {
                original: equation.to_string(),
                balanced: rendered,
                status,
            }
        }
        Err(err) => Row {
            original: equation.to_string(),
            balanced: err.to_string(),
            status: "error",
        },
    }
}

fn print_table(rows: &[Row]) {
    let original_width = rows
        .iter()
        .map(|row| row.original.chars().count())
        .chain(["Original".len()])
        .max()
        .unwrap_or(0);
    let balanced_width = rows
        .iter()
        .map(|row| row.balanced.chars().count())
        .chain(["Balanced".len()])
        .max()
        .unwrap_or(0);

    println!("{:original_width$}  {:balanced_width$}  Status", "Original", "Balanced");
    for row in rows {
        println!(
            "{:original_width$}  {:balanced_width$}  {}",
            row.original, row.balanced, row.status
        );
    }
}

/// Quotes a CSV field when it contains a delimiter or a quote.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_csv(path: &PathBuf, rows: &[Row]) -> std::io::Result<()> {
    let mut output = String::from("Original,Balanced,Status\n");
    for row in rows {
        output.push_str(&format!(
            "{},{},{}\n",
            csv_field(&row.original),
            csv_field(&row.balanced),
            row.status
        ));
    }
    fs::write(path, output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut equations = cli.equations.clone();
    if let Some(path) = &cli.file {
        match fs::read_to_string(path) {
            Ok(text) => {
                equations.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from),
                );
            }
            Err(err) => {
                eprintln!("error: cannot read {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        }
    }
    if equations.is_empty() {
        eprintln!("error: no equations given (pass them as arguments or with --file)");
        return ExitCode::FAILURE;
    }

    let rows: Vec<Row> = equations.iter().map(|equation| process(equation)).collect();
    print_table(&rows);

    if let Some(path) = &cli.csv {
        if let Err(err) = write_csv(path, &rows) {
            eprintln!("error: cannot write {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    }

    if rows.iter().all(|row| row.status == "balanced") {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
