//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::{LoadedTransforms, TransformConfigLoader};
use contracts::{SensorRoute, StaticTransform};
use router::{RouteNaming, SensorRouteRegistry};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    routes: Vec<SensorRoute>,
    transforms: Vec<StaticTransform>,
    rejected: Vec<RejectedSummary>,
}

#[derive(Serialize)]
struct RejectedSummary {
    key: String,
    error: String,
}

/// Execute the `validate` command
///
/// Rejected entries are reported but do not make the file invalid; an
/// unreadable or non-object file does.
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(transforms = %args.transforms.display(), "Validating transforms");

    let result = validate_transforms(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Transforms validation failed")
    }
}

fn validate_transforms(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.transforms.display().to_string();

    match TransformConfigLoader::load_from_path(&args.transforms, &args.parent_frame_id) {
        Ok(loaded) => summarize(config_path, loaded),
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            routes: Vec::new(),
            transforms: Vec::new(),
            rejected: Vec::new(),
        },
    }
}

fn summarize(config_path: String, loaded: LoadedTransforms) -> ValidationResult {
    let registry =
        SensorRouteRegistry::from_entries(RouteNaming::default(), loaded.entries.values(), false);

    ValidationResult {
        valid: true,
        config_path,
        error: None,
        routes: registry.routes(),
        transforms: loaded.transforms,
        rejected: loaded
            .rejected
            .into_iter()
            .map(|r| RejectedSummary {
                key: r.key,
                error: r.error.to_string(),
            })
            .collect(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Transforms file is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
        return;
    }

    println!("✓ Transforms file is valid: {}", result.config_path);

    println!("\n  Routes ({}):", result.routes.len());
    for route in &result.routes {
        println!(
            "  - {} -> frame '{}', points '{}', status '{}'",
            route.serial_number, route.frame_id, route.point_channel, route.status_channel
        );
    }

    if !result.rejected.is_empty() {
        println!("\n⚠ Skipped entries ({}):", result.rejected.len());
        for rejected in &result.rejected {
            println!("  - {}: {}", rejected.key, rejected.error);
        }
    }
}
