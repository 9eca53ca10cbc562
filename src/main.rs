pub mod classifier;
pub mod client;
pub mod comments;
pub mod error;
pub mod imports;
pub mod locator;
pub mod normalizer;
pub mod resolver;
pub mod utils;

use crate::classifier::{can_import_via_pip, PackageClassifier};
use crate::client::{AnalysisClient, AnalysisRequest};
use crate::comments::neutralize_block_comments;
use crate::imports::pip_imports_recursive;
use crate::locator::{enumerate_functions, locate_function};
use crate::normalizer::Normalizer;
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Where analysis requests go unless the caller overrides it.
const DEFAULT_ANALYZE_URL: &str = "https://api.pylift.dev/analyze";

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Python file to analyze.
    file: PathBuf,

    /// Name of the function to analyze.
    /// Required when the file defines more than one function.
    name: Option<String>,

    /// Ask the analysis service to suggest a patch.
    #[arg(short, long)]
    patch: bool,

    /// Bearer token for the analysis service.
    /// Token acquisition is external; pass it here or via the environment.
    #[arg(long, env = "PYLIFT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Analysis endpoint URL.
    #[arg(long, default_value = DEFAULT_ANALYZE_URL)]
    url: String,

    /// Skip the package-index check of the flattened pip imports.
    #[arg(long)]
    no_verify: bool,
}

/// Main entry point of the application.
///
/// This function handles argument parsing, function selection, dependency
/// flattening, normalization, the analysis request, and output rendering.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Scanning {} ...", cli.file.display());

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            println!(
                "Encountered exception trying to read {}: {}. Cannot continue 😢.",
                cli.file.display(),
                e
            );
            return Ok(());
        }
    };

    // Docstrings are neutralized up front so nothing downstream mistakes
    // them for executable text.
    let neutralized = neutralize_block_comments(&source);

    let function_names = match enumerate_functions(&neutralized) {
        Ok(names) => names,
        Err(e) => {
            println!("Encountered exception trying to parse {}. Cannot continue 😢.", e);
            return Ok(());
        }
    };

    // Pick the function: the only one, or the one the caller named.
    let name = match (function_names.len(), &cli.name) {
        (0, _) => {
            println!(
                "There were no functions in {}. Cannot continue 😢.",
                cli.file.display()
            );
            return Ok(());
        }
        (1, _) => function_names[0].clone(),
        (_, Some(name)) => name.clone(),
        (_, None) => {
            println!(
                "Since there is more than one function in the file, please specify \
                 which one you want to analyze, e.g.,\n$ pylift {} {}",
                cli.file.display(),
                function_names[0]
            );
            return Ok(());
        }
    };

    let function_str = match locate_function(&neutralized, &name) {
        Ok(Some(function_str)) => function_str,
        Ok(None) => {
            println!("🔍 Function named {} not found in {}.", name, cli.file.display());
            return Ok(());
        }
        Err(e) => {
            println!("Encountered exception trying to parse: {}. Cannot continue 😢.", e);
            return Ok(());
        }
    };

    let classifier = PackageClassifier::from_env();

    println!("Computing pip imports.");
    let mut pip_imports = match pip_imports_recursive(&cli.file, &classifier) {
        Ok(pip_imports) => pip_imports,
        Err(e) => {
            println!("Error trying to resolve pip imports: {}", e);
            Vec::new()
        }
    };

    // Make sure each flattened name is actually installable; when it is
    // not, ask the user which distribution provides it.
    if !cli.no_verify {
        let mut verified = Vec::new();
        for pip_import in pip_imports {
            let mut package_name = pip_import;
            while !can_import_via_pip(&package_name)? {
                println!(
                    "It looks like we can't get {package_name} by just running \
                     `pip install {package_name}`. What package do we need to \
                     install to get it?"
                );
                print!("Package name: ");
                std::io::stdout().flush()?;
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                package_name = answer.trim().to_string();
            }
            println!("Adding {package_name} to pip_imports.");
            verified.push(package_name);
        }
        pip_imports = verified;
    }

    let normalized_code = Normalizer::new(&classifier).normalize_file(&cli.file)?;

    let Some(token) = cli.token else {
        println!("No token given; pass --token or set PYLIFT_TOKEN. Cannot continue 😢.");
        return Ok(());
    };

    let request = AnalysisRequest {
        test_func: function_str,
        patch_requested: cli.patch,
        pip_imports,
        test_code: normalized_code,
    };

    println!("Analyzing.  Should take about 1 minute ...");
    let response = match AnalysisClient::new(cli.url, token).analyze(&request) {
        Ok(response) => response,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    print_response(&response);

    if response.contains('❌') && !cli.patch {
        println!(
            "\nWant a generated patch?  Try:\n\n\tpylift {} {} -p\n",
            cli.file.display(),
            name
        );
    }

    Ok(())
}

/// Renders the response text, printing fenced Python code blocks in color
/// so they stand apart from the surrounding prose.
fn print_response(response_text: &str) {
    let mut in_code_block = false;
    for line in response_text.lines() {
        if line.trim() == "```python" {
            in_code_block = true;
        } else if line.trim() == "```" && in_code_block {
            in_code_block = false;
        } else if in_code_block {
            println!("{}", line.cyan());
        } else {
            println!("{}", line);
        }
    }
}
