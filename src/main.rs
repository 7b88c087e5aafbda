//! forge – fill an HTML template with JSON data and print it to PDF.
//!
//! Usage:
//!   forge <template.html> [output.pdf] [--data data.json] [--format A4]
//!         [--landscape] [--keep] [--config settings.json] [--no-sandbox]
//!
//! If `output.pdf` is omitted the PDF is written next to the template with
//! the same stem (e.g. `letter.html` → `letter.pdf`).

use std::{env, fs, path::PathBuf, process};

use doc_forge::pipeline::ChromiumRasterizer;
use doc_forge::{ConversionPipeline, DocumentPatch, Registry, Renderer, SettingsPatch};
use serde_json::Value;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut template_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut format: Option<String> = None;
    let mut landscape = false;
    let mut keep = false;
    let mut no_sandbox = false;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--landscape" | "-l" => landscape = true,
            "--keep" | "-k" => keep = true,
            "--no-sandbox" => no_sandbox = true,
            "--data" | "-d" => {
                data_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0])))
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(flag_value(&mut iter, arg, &args[0])))
            }
            "--format" | "-f" => format = Some(flag_value(&mut iter, arg, &args[0])),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    template_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let template = match template_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no template file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    // Default output: same directory + same stem as the template, but .pdf
    let output = output_path.unwrap_or_else(|| {
        let mut o = template.clone();
        o.set_extension("pdf");
        o
    });

    let mut registry = Registry::default();
    if let Some(path) = config_path {
        let patch = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| SettingsPatch::from_json(&json));
        match patch {
            Ok(patch) => registry.configure(patch),
            Err(e) => {
                eprintln!("Error reading config '{}': {e}", path.display());
                process::exit(1);
            }
        }
    }

    let data: Value = match data_path {
        Some(path) => match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()))
        {
            Ok(value) => value,
            Err(e) => {
                eprintln!("Error reading data '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => Value::Null,
    };

    // Template name: stem of the template filename.
    let name = template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template")
        .to_string();

    if let Err(e) = registry.register(&name, &template) {
        eprintln!("Error registering '{}': {e}", template.display());
        process::exit(1);
    }

    let mut html = Renderer::new()
        .create_correspondence(&registry, &name, &data)
        .await;
    if html.body.is_empty() {
        fail_with_protocol("Error rendering template", &html.protocol);
    }
    html.apply(DocumentPatch {
        format,
        landscape: landscape.then_some(true),
        ..DocumentPatch::default()
    });

    let mut rasterizer = ChromiumRasterizer::new();
    if no_sandbox {
        rasterizer = rasterizer.without_sandbox();
    }
    let pipeline = ConversionPipeline::new(rasterizer, registry.settings());

    let mut pdf = pipeline.convert_document(&mut html, keep).await;
    if pdf.base64.is_empty() {
        fail_with_protocol("Error generating PDF", &pdf.protocol);
    }

    if let Some(kept) = &pdf.filename {
        eprintln!("Kept temp PDF '{}'", kept.display());
    }
    if let Some(kept) = &html.filename {
        eprintln!("Kept temp HTML '{}'", kept.display());
    }

    pdf.filename = Some(output.clone());
    if !pdf.check_out(registry.settings()).await {
        fail_with_protocol("Error writing PDF", &pdf.protocol);
    }

    for entry in &pdf.protocol {
        log::info!("{entry}");
    }
    eprintln!(
        "Wrote '{}' ({}{})",
        output.display(),
        pdf.format,
        if pdf.landscape { ", landscape" } else { "" }
    );
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str, prog: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn fail_with_protocol(context: &str, protocol: &doc_forge::Protocol) -> ! {
    eprintln!("{context}:");
    for entry in protocol {
        eprintln!("  {entry}");
    }
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("forge – HTML template to PDF converter (doc-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template.html> [output.pdf] [--data data.json] [--format A4] [--landscape]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template.html>  MiniJinja HTML template");
    eprintln!("  [output.pdf]     Output path  (default: same stem as template with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --data, -d       JSON object used to fill the template");
    eprintln!("  --format, -f     Paper format: A0-A6, Letter, Legal, Tabloid, Ledger (default: A4)");
    eprintln!("  --landscape      Use landscape page orientation");
    eprintln!("  --keep, -k       Keep the intermediate HTML and PDF temp files");
    eprintln!("  --config, -c     JSON settings file (directory, buffer_size, ...)");
    eprintln!("  --no-sandbox     Run Chromium without its sandbox (containers, root)");
    eprintln!("  --help           Print this message");
}
