use clap::{Args, Parser, Subcommand};
use dosing_core::audit::{JsonlSink, OverrideEvent, OverrideSink};
use dosing_core::config::OutputFormat;
use dosing_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "doseguard")]
#[command(about = "Medication dosing and safety guardrails", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a dose and run every safety check
    Evaluate {
        #[command(flatten)]
        input: DoseArgs,
    },

    /// Record an explicit override of a blocked verdict
    Override {
        #[command(flatten)]
        input: DoseArgs,

        /// Clinical reason for overriding
        #[arg(long)]
        reason: String,

        /// Who authorized the override
        #[arg(long = "by")]
        authorized_by: String,

        /// Repeat the medication id to confirm
        #[arg(long)]
        confirm: String,
    },

    /// List catalog medications
    List {
        /// Only profiles usable for this patient type
        #[arg(long)]
        patient: Option<PatientType>,

        /// Only profiles carrying this indication
        #[arg(long)]
        indication: Option<String>,
    },

    /// Show one medication profile with its rules
    Show { medication: String },

    /// Show the age-bracket weight table
    Brackets,

    /// Check the built-in formulary for configuration errors
    Validate,

    /// Roll up the override log to CSV
    Rollup {
        /// Clean up processed override logs after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// Show the active configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        write_default: bool,
    },
}

#[derive(Args)]
struct DoseArgs {
    /// Medication profile id (see `doseguard list`)
    medication: String,

    /// Patient weight in kilograms
    #[arg(long, allow_negative_numbers = true)]
    weight: f64,

    /// pediatric or adult (falls back to [defaults] patient_type)
    #[arg(long)]
    patient: Option<PatientType>,

    /// Declared age bracket, e.g. 2years (see `doseguard brackets`)
    #[arg(long)]
    age_bracket: Option<String>,

    /// Concurrent medication class (repeatable)
    #[arg(long = "taking")]
    taking: Vec<String>,

    /// Patient condition (repeatable)
    #[arg(long = "condition")]
    conditions: Vec<String>,
}

impl DoseArgs {
    fn to_request(&self, config: &Config) -> Result<DoseRequest> {
        let patient_type = self
            .patient
            .or(config.defaults.patient_type)
            .ok_or_else(|| {
                Error::Config(
                    "patient type required: pass --patient or set [defaults] patient_type".into(),
                )
            })?;

        let mut request = DoseRequest::new(&self.medication, self.weight, patient_type)
            .with_concurrent_classes(&self.taking)
            .with_conditions(&self.conditions);
        if let Some(ref bracket) = self.age_bracket {
            request = request.with_age_bracket(bracket);
        }
        Ok(request)
    }
}

fn main() -> Result<()> {
    dosing_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let json = cli.json || config.output.format == OutputFormat::Json;

    match cli.command {
        Commands::Evaluate { input } => cmd_evaluate(&input, json, &config),
        Commands::Override {
            input,
            reason,
            authorized_by,
            confirm,
        } => cmd_override(&data_dir, &input, &reason, &authorized_by, &confirm, &config),
        Commands::List {
            patient,
            indication,
        } => cmd_list(patient, indication.as_deref(), json),
        Commands::Show { medication } => cmd_show(&medication, json),
        Commands::Brackets => cmd_brackets(json),
        Commands::Validate => cmd_validate(),
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, cleanup),
        Commands::Config { write_default } => cmd_config(&config, write_default),
    }
}

fn cmd_evaluate(input: &DoseArgs, json: bool, config: &Config) -> Result<()> {
    let engine = GuardrailEngine::builtin()?;
    let request = input.to_request(config)?;
    let verdict = engine.evaluate(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    let profile = engine.formulary().catalog().lookup(&verdict.medication_id)?;
    display_verdict(profile, &request, &verdict);
    Ok(())
}

fn cmd_override(
    data_dir: &Path,
    input: &DoseArgs,
    reason: &str,
    authorized_by: &str,
    confirm: &str,
    config: &Config,
) -> Result<()> {
    let engine = GuardrailEngine::builtin()?;
    let request = input.to_request(config)?;
    let verdict = engine.evaluate(&request)?;

    if verdict.can_administer {
        println!(
            "✓ {} is not blocked at {:.1} kg; no override needed.",
            verdict.medication_id, request.weight_kg
        );
        return Ok(());
    }

    if confirm.trim().to_ascii_lowercase() != verdict.medication_id {
        return Err(Error::Audit(format!(
            "--confirm '{}' does not match medication '{}'",
            confirm, verdict.medication_id
        )));
    }

    let event = OverrideEvent::from_verdict(
        &verdict,
        request.weight_kg,
        request.patient_type,
        reason,
        authorized_by,
    )?;

    let log_path = Config::override_log_path(data_dir);
    let mut sink = JsonlSink::new(&log_path);
    sink.append(&event)?;

    println!("\n⚠ OVERRIDE RECORDED");
    println!("  Medication:    {}", event.medication_id);
    println!("  Dose:          {}", verdict.dose.dose_display);
    for message in &event.blocking_alerts {
        println!("  Overrode:      {}", message);
    }
    println!("  Reason:        {}", event.reason);
    println!("  Authorized by: {}", event.authorized_by);
    println!("  Event:         {}", event.id);
    println!("  Log:           {}", log_path.display());

    Ok(())
}

fn cmd_list(patient: Option<PatientType>, indication: Option<&str>, json: bool) -> Result<()> {
    let catalog = Formulary::builtin()?.catalog();

    let meds = match (indication, patient) {
        (Some(indication), Some(patient)) => {
            let mut meds = catalog.list_by_indication(indication);
            meds.retain(|m| m.patient_type.includes(patient));
            meds
        }
        (Some(indication), None) => catalog.list_by_indication(indication),
        (None, Some(patient)) => catalog.list_by_patient_type(patient),
        (None, None) => catalog.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&meds)?);
        return Ok(());
    }

    if meds.is_empty() {
        println!("No medications match.");
        return Ok(());
    }

    for med in meds {
        println!(
            "  {:<24} {:<28} {:<18} {}",
            med.id,
            med.name,
            med.patient_type.to_string(),
            dosing_summary(med)
        );
    }
    Ok(())
}

fn cmd_show(medication: &str, json: bool) -> Result<()> {
    let formulary = Formulary::builtin()?;
    let profile = formulary
        .catalog()
        .lookup(&medication.trim().to_ascii_lowercase())?;

    let interactions: Vec<_> = formulary
        .interactions()
        .iter()
        .filter(|r| r.drug1 == profile.base_drug_id || r.drug2 == profile.base_drug_id)
        .collect();
    let contraindications: Vec<_> = formulary
        .contraindications()
        .iter()
        .filter(|r| r.medication_id == profile.id)
        .collect();

    if json {
        let value = serde_json::json!({
            "profile": profile,
            "interactions": interactions,
            "contraindications": contraindications,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", profile.name);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Id:            {}", profile.id);
    println!("  Drug:          {}", profile.base_drug_id);
    println!("  Patients:      {}", profile.patient_type);
    println!("  Dosing:        {}", dosing_summary(profile));
    if let Some(min) = profile.min_dose {
        println!(
            "  Minimum:       {}",
            dose::format_dose(min, profile.dose_unit)
        );
    }
    println!("  Concentration: {}", profile.concentration);
    println!("  Route:         {}", profile.route);
    println!("  Indications:   {}", profile.indications.join(", "));
    if let Some(ref notes) = profile.notes {
        println!("  Notes:         {}", notes);
    }
    if let Some(ref notes) = profile.jurisdiction_notes {
        println!("  Jurisdiction:  {}", notes);
    }

    if !interactions.is_empty() {
        println!();
        println!("  Interactions:");
        for rule in interactions {
            println!(
                "    - {} ({}): {}",
                rule.counterpart(&profile.base_drug_id),
                rule.severity,
                rule.description
            );
        }
    }

    if !contraindications.is_empty() {
        println!();
        println!("  Contraindications:");
        for rule in contraindications {
            println!(
                "    - {} ({:?}): {}",
                rule.condition, rule.severity, rule.message
            );
        }
    }

    println!();
    Ok(())
}

fn cmd_brackets(json: bool) -> Result<()> {
    let table = Formulary::builtin()?.weight_ranges();

    if json {
        let mut map = serde_json::Map::new();
        for (bracket, range) in table.iter() {
            map.insert(bracket.to_string(), serde_json::to_value(range)?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("  {:<10} {:>8} {:>8} {:>8}", "bracket", "min kg", "typical", "max kg");
    for (bracket, range) in table.iter() {
        println!(
            "  {:<10} {:>8.1} {:>8.1} {:>8.1}",
            bracket, range.min_kg, range.typical_kg, range.max_kg
        );
    }
    Ok(())
}

fn cmd_validate() -> Result<()> {
    match Formulary::builtin() {
        Ok(formulary) => {
            println!(
                "✓ Formulary valid: {} medications, {} interaction rules, {} contraindications, {} age brackets",
                formulary.catalog().len(),
                formulary.interactions().len(),
                formulary.contraindications().len(),
                formulary.weight_ranges().len()
            );
            Ok(())
        }
        Err(Error::CatalogValidation(problems)) => {
            eprintln!("Formulary validation errors:");
            for problem in problems.split("; ") {
                eprintln!("  - {}", problem);
            }
            Err(Error::CatalogValidation("Invalid formulary".into()))
        }
        Err(e) => Err(e),
    }
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let log_path = Config::override_log_path(data_dir);
    let csv_path = Config::override_csv_path(data_dir);

    if !log_path.exists() {
        println!("No override log found - nothing to roll up.");
        return Ok(());
    }

    let count = csv_rollup::overrides_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} overrides to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(audit_dir) = log_path.parent() {
            let cleaned = csv_rollup::cleanup_processed_logs(audit_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed override logs", cleaned);
            }
        }
    }

    Ok(())
}

fn cmd_config(config: &Config, write_default: bool) -> Result<()> {
    let path = Config::default_config_path();

    if write_default {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            Config::default().save_to(&path)?;
            println!("✓ Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    println!("# {}", path.display());
    print!("{}", contents);
    Ok(())
}

fn dosing_summary(profile: &MedicationProfile) -> String {
    let max = dose::format_dose(profile.max_dose, profile.dose_unit);
    match profile.dosing {
        DosingMode::WeightBased { dose_per_kg } => {
            format!("{} {}/kg, max {}", dose_per_kg, profile.dose_unit, max)
        }
        DosingMode::Fixed { typical } => format!(
            "fixed {}, max {}",
            dose::format_dose(typical, profile.dose_unit),
            max
        ),
    }
}

fn display_verdict(profile: &MedicationProfile, request: &DoseRequest, verdict: &GuardrailVerdict) {
    println!("\n╭─────────────────────────────────────────╮");
    if verdict.can_administer {
        println!("│  OK TO ADMINISTER");
    } else {
        println!("│  BLOCKED - OVERRIDE REQUIRED");
    }
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  {} ({}, {:.1} kg)",
        profile.name, request.patient_type, request.weight_kg
    );
    println!(
        "  Dose:   {}  →  {} of {}",
        verdict.dose.dose_display, verdict.dose.volume_display, profile.concentration
    );
    println!("  Route:  {}", profile.route);
    if verdict.dose.ceiling_applied {
        println!(
            "  Capped: calculated {} exceeded the maximum",
            dose::format_dose(verdict.dose.raw_dose, verdict.dose.dose_unit)
        );
    }

    if !verdict.alerts.is_empty() {
        println!();
        for alert in &verdict.alerts {
            println!("  [{}] {}: {}", alert.severity, alert.category, alert.message);
            if let Some(ref recommendation) = alert.recommendation {
                println!("      → {}", recommendation);
            }
        }
    }

    if verdict.requires_override {
        println!();
        println!(
            "  Do not administer without an override: doseguard override {} --confirm {} ...",
            verdict.medication_id, verdict.medication_id
        );
        tracing::info!(medication = %verdict.medication_id, "displayed blocked verdict");
    }

    println!();
}
