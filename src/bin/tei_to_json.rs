//! Export TEI files to structured JSON records
//!
//! Converts every `*.xml` file of a directory (GROBID TEI output) and writes
//! one `<stem>.json` record per file.
//!
//! Usage:
//!   cargo run --release --bin tei_to_json -- --input-dir tei/ --output-dir json/
//!   cargo run --release --bin tei_to_json -- --input-dir tei/ --strict --verbose
//!
//! Set `RUST_LOG=debug` for per-document conversion detail.

use tei_oxide::config::ConverterConfig;
use tei_oxide::{save_document_file, DocumentAssembler};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

struct ExportConfig {
    input_dir: PathBuf,
    output_dir: PathBuf,
    verbose: bool,
    strict: bool,
}

impl ExportConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut input_dir = PathBuf::from("tei");
        let mut output_dir = PathBuf::from("json_exports");
        let mut verbose = false;
        let mut strict = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--input-dir" => {
                    i += 1;
                    if i < args.len() {
                        input_dir = PathBuf::from(&args[i]);
                    }
                },
                "--output-dir" => {
                    i += 1;
                    if i < args.len() {
                        output_dir = PathBuf::from(&args[i]);
                    }
                },
                "--verbose" | "-v" => {
                    verbose = true;
                },
                "--strict" => {
                    strict = true;
                },
                other => eprintln!("Ignoring unknown argument: {}", other),
            }
            i += 1;
        }

        Self {
            input_dir,
            output_dir,
            verbose,
            strict,
        }
    }
}

fn discover_tei_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        eprintln!("Error: Directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "xml"))
            .collect(),
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            return Vec::new();
        },
    };
    // Stable processing order across platforms
    files.sort();
    files
}

fn export_file(
    assembler: &DocumentAssembler,
    path: &Path,
    output_dir: &Path,
    verbose: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let doc = assembler.convert_file(path)?;

    let output_file = output_dir.join(format!("{}.json", doc.paper_id));
    save_document_file(&doc, &output_file)?;

    if verbose {
        let paragraphs = doc.paragraphs().count();
        let spans = doc.spans().count();
        println!("  ✅ Exported to: {}", output_file.display());
        println!(
            "  📝 Paragraphs: {}, Spans: {}, Bibliography: {}, Assets: {}",
            paragraphs,
            spans,
            doc.bibliography.len(),
            doc.assets.len()
        );
        for warning in &doc.diagnostics.warnings {
            println!("  ⚠ {}", warning);
        }
    }

    Ok(doc.diagnostics.unresolved_references)
}

fn main() {
    env_logger::init();

    let config = ExportConfig::from_args();

    println!("TEI to JSON Exporter");
    println!("====================");
    println!("Input directory: {}", config.input_dir.display());
    println!("Output directory: {}", config.output_dir.display());
    println!("Mode: {}", if config.strict { "strict" } else { "default" });
    println!();

    let files = discover_tei_files(&config.input_dir);
    println!("Found {} TEI files\n", files.len());

    if files.is_empty() {
        eprintln!("No TEI files found in {}", config.input_dir.display());
        return;
    }

    if let Err(e) = fs::create_dir_all(&config.output_dir) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    let converter_config = if config.strict {
        ConverterConfig::strict()
    } else {
        ConverterConfig::default()
    };
    let assembler = DocumentAssembler::with_config(converter_config);

    let start = Instant::now();
    let mut success_count = 0;
    let mut error_count = 0;
    let mut unresolved_total = 0;

    for (i, path) in files.iter().enumerate() {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        print!("[{}/{}] Converting {} ... ", i + 1, files.len(), filename);
        let _ = std::io::stdout().flush();

        match export_file(&assembler, path, &config.output_dir, config.verbose) {
            Ok(unresolved) => {
                println!("✓ ({} unresolved)", unresolved);
                unresolved_total += unresolved;
                success_count += 1;
            },
            Err(e) => {
                println!("✗ Error: {}", e);
                error_count += 1;
            },
        }
    }

    let elapsed = start.elapsed();

    println!("\n{}", "=".repeat(70));
    println!("Export Complete");
    println!("{}", "=".repeat(70));
    println!("Success: {}/{}", success_count, files.len());
    println!("Errors: {}", error_count);
    println!("Unresolved references: {}", unresolved_total);
    println!("Time: {:?}", elapsed);
    println!("Output: {}", config.output_dir.display());
    println!("{}", "=".repeat(70));
}
