//! `techlib specialize`: lists the specializations of a technology document.

use serde::Serialize;
use techlib_specialize::{plan_library, SpecializerSettings};
use techlib_store::TechnologyManager;

use crate::pipeline::load_run_config;
use crate::{GlobalArgs, ReportFormat, SpecializeArgs};

/// The specializations planned for one source unit.
#[derive(Debug, Serialize)]
pub struct PlannedUnit {
    /// Library holding the source unit.
    pub library: String,
    /// Template or concrete unit being specialized.
    pub source: String,
    /// Whether the source is a template.
    pub template: bool,
    /// Specialization names in planning order.
    pub specializations: Vec<String>,
}

/// Runs the `techlib specialize` command.
pub fn run(args: &SpecializeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (_, config) = load_run_config(global)?;
    let mut manager = TechnologyManager::new();
    manager.load(&args.technology, config.device.kind)?;

    if let Some(ref library) = args.library {
        if manager.library(library).is_none() {
            eprintln!(
                "error: library '{library}' not found in {}",
                args.technology.display()
            );
            return Ok(1);
        }
    }

    let settings = SpecializerSettings::from_config(&config);
    let units = collect(&manager, &settings, args.library.as_deref())?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&units)?),
        ReportFormat::Text => print!("{}", render_text(&units)),
    }
    if !global.quiet {
        let total: usize = units.iter().map(|u| u.specializations.len()).sum();
        eprintln!("   Planned {total} specializations of {} units", units.len());
    }
    Ok(0)
}

/// Plans every library of `manager`, or only `library` when given.
pub fn collect(
    manager: &TechnologyManager,
    settings: &SpecializerSettings,
    library: Option<&str>,
) -> Result<Vec<PlannedUnit>, Box<dyn std::error::Error>> {
    let mut units = Vec::new();
    for store in manager.libraries() {
        if library.is_some_and(|name| name != store.name()) {
            continue;
        }
        for plan in plan_library(store, settings)? {
            let mut seen = std::collections::BTreeSet::new();
            let specializations = plan
                .names()
                .filter(|name| seen.insert(*name))
                .map(str::to_string)
                .collect();
            units.push(PlannedUnit {
                library: plan.library,
                source: plan.source,
                template: plan.is_template,
                specializations,
            });
        }
    }
    Ok(units)
}

fn render_text(units: &[PlannedUnit]) -> String {
    let mut out = String::new();
    for unit in units {
        let kind = if unit.template { "template" } else { "unit" };
        out.push_str(&format!(
            "{}::{} ({kind}, {})\n",
            unit.library,
            unit.source,
            unit.specializations.len()
        ));
        for name in &unit.specializations {
            out.push_str(&format!("  {name}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use techlib_model::{
        parse_supported_types, DataType, FunctionalUnit, FunctionalUnitTemplate,
        HdlDescription, Operation, Port, PortDirection,
    };

    fn manager() -> TechnologyManager {
        let mut unit = FunctionalUnit::new("AND2");
        unit.description = Some(HdlDescription::Verilog);
        unit.ports = vec![
            Port::new("in1", PortDirection::In, DataType::Int, 32),
            Port::new("in2", PortDirection::In, DataType::Int, 32),
            Port::new("out1", PortDirection::Out, DataType::Int, 32),
        ];
        let mut op = Operation::new("bit_and_expr");
        op.supported_types = parse_supported_types("int:8").unwrap();
        unit.operations = vec![op];

        let mut manager = TechnologyManager::new();
        manager
            .add(FunctionalUnitTemplate::new(unit).into(), "STD_FU")
            .unwrap();
        manager
            .add(FunctionalUnit::new("LOGIC_FU").into(), "GLUE")
            .unwrap();
        manager
    }

    #[test]
    fn collect_lists_template_variants() {
        let units = collect(&manager(), &SpecializerSettings::default(), None).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].library, "STD_FU");
        assert_eq!(units[0].source, "AND2");
        assert!(units[0].template);
        assert_eq!(units[0].specializations.len(), 3);
        assert!(units[0].specializations.iter().all(|n| n.starts_with("AND2_")));
    }

    #[test]
    fn collect_filters_library() {
        let units = collect(&manager(), &SpecializerSettings::default(), Some("GLUE")).unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn text_report_lists_names() {
        let units = collect(&manager(), &SpecializerSettings::default(), None).unwrap();
        let text = render_text(&units);
        assert!(text.starts_with("STD_FU::AND2 (template, 3)\n"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn run_reads_saved_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("technology.json");
        manager().save(&path).unwrap();
        std::fs::write(dir.path().join("techlib.toml"), "").unwrap();

        let args = SpecializeArgs {
            technology: path,
            library: Some("MISSING".to_string()),
            format: ReportFormat::Json,
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: 0,
            config: Some(dir.path().join("techlib.toml").to_string_lossy().into_owned()),
        };
        assert_eq!(run(&args, &global).unwrap(), 1);

        let args = SpecializeArgs {
            library: None,
            ..args
        };
        assert_eq!(run(&args, &global).unwrap(), 0);
    }
}
