// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::{BoardRuntime, render_items};
use std::env;
use std::path::PathBuf;
use time::Date;
use tracing::info;
use tracing_subscriber::EnvFilter;
use urgentboard_app::{BoardCommand, FieldId, ItemId, ItemPatch};
use urgentboard_db::Store;
use urgentboard_db::validation::{parse_assignment, parse_item_ids, parse_required_date};
use urgentboard_testkit::ItemFaker;

const DEMO_ITEM_COUNT: usize = 24;
const DEMO_SEED: u64 = 2026;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `urgentboard --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_level());

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or URGENTBOARD_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        seed_demo_items(&store)?;
    }
    if options.check_only {
        return Ok(());
    }

    let mut runtime = BoardRuntime::new(store, &config)?;
    apply_view_options(&mut runtime, &options);

    if options.create {
        let draft = ItemFaker::new(DEMO_SEED + runtime.store().count_items()? as u64).item_draft();
        report(runtime.create(&draft)?);
    }
    for (id, patch) in &options.assignments {
        report(runtime.update(*id, patch)?);
    }
    if !options.delete_ids.is_empty() {
        match runtime.delete(&options.delete_ids, options.assume_yes)? {
            Some(resolution) => report(Some(resolution)),
            None => eprintln!("nothing deleted; pass --yes to confirm"),
        }
    }

    let items = runtime.items()?;
    print!("{}", render_items(runtime.session().catalog(), &items));
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn seed_demo_items(store: &Store) -> Result<()> {
    let mut faker = ItemFaker::new(DEMO_SEED);
    for draft in faker.item_drafts(DEMO_ITEM_COUNT) {
        store.create_item(&draft)?;
    }
    info!(count = DEMO_ITEM_COUNT, "seeded demo items");
    Ok(())
}

fn apply_view_options(runtime: &mut BoardRuntime, options: &CliOptions) {
    if let Some(encoded) = &options.sort {
        runtime.replace_sort(encoded);
    }
    if !options.search_fields.is_empty() {
        let fields = runtime
            .session()
            .search_fields()
            .iter()
            .map(|field| field.path)
            .collect::<Vec<_>>();
        for field in fields {
            runtime.dispatch(BoardCommand::SelectSearchField(
                field,
                options.search_fields.contains(&field),
            ));
        }
    }
    if options.date_from.is_some() || options.date_to.is_some() {
        runtime.dispatch(BoardCommand::SetDateRange {
            from: options.date_from,
            to: options.date_to,
        });
    }
    if let Some(term) = &options.search {
        runtime.dispatch(BoardCommand::Search(term.clone()));
    }
    if let Some(status) = &runtime.session().status_line {
        eprintln!("{status}");
    }
}

fn report(resolution: Option<urgentboard_app::Resolution>) {
    if let Some(resolution) = resolution {
        if resolution.is_error() {
            eprintln!("{}", resolution.notice());
        } else {
            println!("{}", resolution.notice());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    search: Option<String>,
    search_fields: Vec<FieldId>,
    date_from: Option<Date>,
    date_to: Option<Date>,
    sort: Option<String>,
    delete_ids: Vec<ItemId>,
    assignments: Vec<(ItemId, ItemPatch)>,
    create: bool,
    assume_yes: bool,
}

impl CliOptions {
    fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            print_config_path: false,
            print_db_path: false,
            demo: false,
            print_example: false,
            check_only: false,
            show_help: false,
            search: None,
            search_fields: Vec::new(),
            date_from: None,
            date_to: None,
            sort: None,
            delete_ids: Vec::new(),
            assignments: Vec::new(),
            create: false,
            assume_yes: false,
        }
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions::new(default_config_path);

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str, what: &str| {
            iter.next()
                .map(|value| value.as_ref().to_owned())
                .ok_or_else(|| anyhow!("{flag} requires {what}"))
        };
        match arg.as_ref() {
            "--config" => {
                options.config_path = PathBuf::from(value_for("--config", "a file path")?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--search" => {
                options.search = Some(value_for("--search", "a search term")?);
            }
            "--search-field" => {
                let name = value_for("--search-field", "a field name")?;
                let field = FieldId::parse(&name)
                    .ok_or_else(|| anyhow!("--search-field: unknown field {name:?}"))?;
                options.search_fields.push(field);
            }
            "--from" => {
                let raw = value_for("--from", "a date (YYYY-MM-DD)")?;
                options.date_from =
                    Some(parse_required_date(&raw).with_context(|| format!("--from {raw:?}"))?);
            }
            "--to" => {
                let raw = value_for("--to", "a date (YYYY-MM-DD)")?;
                options.date_to =
                    Some(parse_required_date(&raw).with_context(|| format!("--to {raw:?}"))?);
            }
            "--sort" => {
                options.sort = Some(value_for("--sort", "an encoded sort like MATERIAL(A);")?);
            }
            "--delete" => {
                let raw = value_for("--delete", "a comma-separated id list")?;
                options
                    .delete_ids
                    .extend(parse_item_ids(&raw).with_context(|| format!("--delete {raw:?}"))?);
            }
            "--set" => {
                let raw = value_for("--set", "ID:FIELD=VALUE")?;
                options.assignments.push(parse_set(&raw)?);
            }
            "--create" => {
                options.create = true;
            }
            "--yes" | "-y" => {
                options.assume_yes = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

/// `12:comments=call first`
fn parse_set(raw: &str) -> Result<(ItemId, ItemPatch)> {
    let (id, assignment) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("--set {raw:?}: expected ID:FIELD=VALUE"))?;
    let ids = parse_item_ids(id).with_context(|| format!("--set {raw:?}"))?;
    let [id] = ids.as_slice() else {
        return Err(anyhow!("--set {raw:?}: expected exactly one item id"));
    };
    let patch = parse_assignment(assignment).with_context(|| format!("--set {raw:?}"))?;
    Ok((*id, patch))
}

fn print_help() {
    println!("urgentboard");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Run against seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --search <term>          Filter by text in the selected search fields");
    println!("  --search-field <field>   Select a search field (repeatable)");
    println!("  --from <YYYY-MM-DD>      Earliest due date");
    println!("  --to <YYYY-MM-DD>        Latest due date");
    println!("  --sort <FIELD(A);...>    Replace and store the sort order");
    println!("  --create                 Add one generated item");
    println!("  --set <ID:FIELD=VALUE>   Update one field of an item (repeatable)");
    println!("  --delete <id,id,...>     Delete items as one batch");
    println!("  --yes                    Confirm deletes without asking");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args, parse_set};
    use anyhow::Result;
    use std::path::PathBuf;
    use time::macros::date;
    use urgentboard_app::{FieldId, FieldValue, ItemId};

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/urgentboard-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(options, CliOptions::new(default_options_path()));
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--search"], default_options_path())
            .expect_err("missing search term should fail");
        assert!(error.to_string().contains("--search requires"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_collects_filters() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--search",
                "gasket",
                "--search-field",
                "material",
                "--search-field",
                "DESCRIPTION",
                "--from",
                "2026-01-05",
                "--to",
                "2026-01-31",
                "--sort",
                "DUEDATE(D);",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.search.as_deref(), Some("gasket"));
        assert_eq!(
            options.search_fields,
            vec![FieldId::Material, FieldId::Description]
        );
        assert_eq!(options.date_from, Some(date!(2026 - 01 - 05)));
        assert_eq!(options.date_to, Some(date!(2026 - 01 - 31)));
        assert_eq!(options.sort.as_deref(), Some("DUEDATE(D);"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_bad_dates_and_fields() {
        let error = parse_cli_args(vec!["--from", "31/01/2026"], default_options_path())
            .expect_err("bad date should fail");
        assert!(format!("{error:#}").contains("YYYY-MM-DD"));

        let error = parse_cli_args(vec!["--search-field", "colour"], default_options_path())
            .expect_err("unknown field should fail");
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn parse_cli_args_collects_mutations() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--delete",
                "3, 5",
                "--set",
                "7:comments=call first",
                "--create",
                "-y",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.delete_ids, vec![ItemId::new(3), ItemId::new(5)]);
        assert_eq!(options.assignments.len(), 1);
        assert!(options.create);
        assert!(options.assume_yes);
        Ok(())
    }

    #[test]
    fn parse_set_requires_one_id_and_an_assignment() -> Result<()> {
        let (id, patch) = parse_set("12:dueDate=2026-02-01")?;
        assert_eq!(id, ItemId::new(12));
        assert_eq!(patch.field, FieldId::DueDate);
        assert_eq!(
            patch.value,
            FieldValue::Date(Some(date!(2026 - 02 - 01)))
        );

        assert!(parse_set("comments=x").is_err());
        assert!(parse_set("1,2:comments=x").is_err());
        assert!(parse_set("4:quantity=lots").is_err());
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
