use dupe_krill::*;
use getopts::Options;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

enum OutputMode {
    Quiet,
    Text,
    Json,
}

fn main() -> ExitCode {
    env_logger::init();

    let mut opts = Options::new();
    opts.optflag("r", "recurse", "Recurse into subdirectories of every argument");
    opts.optflag("R", "recurse-after", "Recurse only into arguments following a `::` marker");
    opts.optflag("s", "symlinks", "Follow symlinked files and directories");
    opts.optflag("1", "one-file-system", "Don't descend into other filesystems");
    opts.optflag("z", "zeromatch", "Consider zero-length files as duplicates of each other");
    opts.optflag("H", "hardlinks", "Treat files already hardlinked together as matches");
    opts.optflag("p", "permissions", "Require matching permissions/ownership to be considered a match");
    opts.optflag("I", "isolate", "Don't match files introduced by the same argument against each other");
    opts.optflag("T", "partial-only", "Match on a partial (first 4 KiB) hash alone, skipping full hashing");
    opts.optflag("Q", "quick", "Skip the byte-for-byte confirmation pass (hash match is trusted)");
    opts.optopt("C", "chunksize", "Override the I/O chunk size in bytes", "<bytes>");
    opts.optopt("o", "order", "Sort duplicate groups by 'name' (default) or 'mtime'", "<name|mtime>");
    opts.optflag("i", "reverse", "Reverse the sort order");
    opts.optflag("O", "paramorder", "Order by argument position before the sort key");
    opts.optflag("Z", "softabort", "Let a first Ctrl-C finish the current root instead of aborting immediately");
    opts.optflag("A", "nohidden", "Exclude dotfiles");
    opts.optmulti("x", "xsize", "Exclude files matching a size rule: <lt|lte|gt|gte|eq>:<bytes>", "<rule>:<bytes>");
    opts.optmulti("e", "exclude", "Exclude directory entries with this exact name", "<name>");
    opts.optflag("d", "dry-run", "Don't change anything on disk, only report what would happen");
    opts.optopt("L", "linkmode", "Linking strategy: 'hardlink' (default), 'reflink', 'reflink-or-hardlink', or 'symlink'", "<mode>");
    opts.optflag("n", "no-link", "Only report duplicates; don't link anything");
    opts.optflag("D", "delete", "Delete duplicates instead of linking them, prompting for which to keep");
    opts.optflag("N", "noprompt", "With --delete, keep the first file in each group without prompting");
    opts.optflag("q", "quiet", "Hide per-run summary output");
    opts.optflag("", "json", "Print the report as JSON instead of text");
    opts.optflag("h", "help", "This help text");

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());
    let argv: Vec<String> = args.collect();

    let matches = match opts.parse(&argv) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    if matches.opt_present("h") || matches.free.is_empty() {
        println!(
            "Find duplicate files by content (v{}).\n{}\n\n{}",
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_HOMEPAGE"),
            opts.usage(&(opts.short_usage(&program) + " <files or directories>"))
        );
        return ExitCode::SUCCESS;
    }

    match run(matches, &opts, &program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            writeln!(std::io::stderr(), "Error: {e}").ok();
            ExitCode::FAILURE
        }
    }
}

fn run(matches: getopts::Matches, _opts: &Options, _program: &str) -> Result<()> {
    let cfg = build_config(&matches)?;
    let mut engine = Engine::new(cfg)?;

    install_signal_handlers(&engine);

    let recurse_after = matches.opt_present("R");
    let recurse_all = matches.opt_present("r");
    let roots = build_roots(&matches.free, recurse_all, recurse_after);

    let report = engine.run(&roots)?;

    let output_mode = if matches.opt_present("json") {
        OutputMode::Json
    } else if matches.opt_present("quiet") {
        OutputMode::Quiet
    } else {
        OutputMode::Text
    };

    match output_mode {
        OutputMode::Quiet => {}
        OutputMode::Text => actions::report::print_text(engine.arena(), &report),
        OutputMode::Json => {
            #[cfg(feature = "json")]
            actions::json::JsonReport::new(engine.arena(), &report).print();
            #[cfg(not(feature = "json"))]
            {
                eprintln!("this binary was built without JSON support");
                return Err(EngineError::BadConfig("json output requested but the json feature is disabled"));
            }
        }
    }

    let dry_run = matches.opt_present("d");
    if matches.opt_present("D") {
        let mode = if matches.opt_present("N") { actions::DeleteMode::NoPrompt } else { actions::DeleteMode::Prompt };
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut stdout = std::io::stdout();
        let delete_stats =
            actions::delete_duplicates(engine.arena(), &report.duplicate_groups, mode, dry_run, &mut input, &mut stdout)?;
        if !matches.opt_present("q") {
            println!(
                "deleted {} file(s), {} preserved, {} stale, {} error(s)",
                delete_stats.deleted, delete_stats.preserved, delete_stats.skipped_stale, delete_stats.errors,
            );
        }
    } else if !matches.opt_present("n") {
        let mode = match matches.opt_str("L").as_deref() {
            Some("reflink") => actions::LinkMode::Reflink,
            Some("reflink-or-hardlink") => actions::LinkMode::ReflinkOrHardlink,
            Some("symlink") => actions::LinkMode::Symlink,
            Some("hardlink") | None => actions::LinkMode::Hardlink,
            Some(other) => {
                eprintln!("unknown link mode '{other}'");
                return Err(EngineError::BadConfig("unknown link mode"));
            }
        };
        let link_stats = actions::apply_links(engine.arena(), &report.duplicate_groups, mode, dry_run)?;
        if !matches.opt_present("q") {
            println!(
                "linked {} file(s) ({} hardlink(s), {} reflink(s), {} symlink(s)), {} stale, {} error(s)",
                link_stats.hardlinks + link_stats.reflinks + link_stats.symlinks,
                link_stats.hardlinks,
                link_stats.reflinks,
                link_stats.symlinks,
                link_stats.skipped_stale,
                link_stats.errors,
            );
        }
    }

    Ok(())
}

fn build_config(matches: &getopts::Matches) -> Result<Config> {
    let mut cfg = Config::default();
    cfg.recurse = if matches.opt_present("R") {
        Recurse::OnAfterMarker
    } else if matches.opt_present("r") {
        Recurse::On
    } else {
        Recurse::Off
    };
    cfg.follow_symlinks = matches.opt_present("s");
    cfg.one_filesystem = matches.opt_present("1");
    cfg.include_empty = matches.opt_present("z");
    cfg.consider_hardlinks = matches.opt_present("H");
    cfg.permissions_strict = matches.opt_present("p");
    cfg.isolate = matches.opt_present("I");
    cfg.partial_only = matches.opt_present("T");
    cfg.quick = matches.opt_present("Q");
    cfg.soft_abort = matches.opt_present("Z");
    cfg.exclude_hidden = matches.opt_present("A");
    cfg.param_order_tiebreak = matches.opt_present("O");
    cfg.sort_direction = if matches.opt_present("i") { SortDirection::Descending } else { SortDirection::Ascending };
    cfg.order_by = match matches.opt_str("o").as_deref() {
        Some("mtime") => OrderBy::Mtime,
        _ => OrderBy::Name,
    };
    if let Some(raw) = matches.opt_str("C") {
        let size: usize = raw.parse().map_err(|_| EngineError::BadConfig("chunk size must be a positive integer"))?;
        cfg.chunk_size_override = Some(size);
    }
    cfg.exclude_names = matches.opt_strs("e").into_iter().map(Into::into).collect();
    for raw in matches.opt_strs("x") {
        cfg.exclude_rules.push(parse_exclude_rule(&raw)?);
    }

    cfg.validate()?;
    Ok(cfg)
}

fn parse_exclude_rule(raw: &str) -> Result<ExcludeRule> {
    let (kind, size) = raw.split_once(':').ok_or(EngineError::BadConfig("size rule must be '<lt|lte|gt|gte|eq>:<bytes>'"))?;
    let size: u64 = size.parse().map_err(|_| EngineError::BadConfig("size rule's byte count must be a non-negative integer"))?;
    Ok(match kind {
        "lt" => ExcludeRule::SizeLt(size),
        "lte" => ExcludeRule::SizeLtEq(size),
        "gt" => ExcludeRule::SizeGt(size),
        "gte" => ExcludeRule::SizeGtEq(size),
        "eq" => ExcludeRule::SizeEq(size),
        _ => return Err(EngineError::BadConfig("unknown size rule kind")),
    })
}

/// Resolve free arguments into `RootSpec`s. `-R`'s marker-argument
/// convention: a literal `::` argument divides non-recursive roots
/// (before) from recursive ones (after), matching jdupes's `-R`/`dir::`
/// separator in spirit without needing its exact tag syntax.
fn build_roots(free: &[String], recurse_all: bool, recurse_after: bool) -> Vec<RootSpec> {
    if !recurse_after {
        return free.iter().map(|a| RootSpec { path: PathBuf::from(a), recurse: recurse_all }).collect();
    }

    let mut past_marker = false;
    free.iter()
        .filter_map(|a| {
            if a == "::" {
                past_marker = true;
                None
            } else {
                Some(RootSpec { path: PathBuf::from(a), recurse: past_marker })
            }
        })
        .collect()
}

fn install_signal_handlers(engine: &Engine) {
    let hard = engine.cancellation_token();
    let soft = engine.soft_cancellation_token();
    let soft_abort = engine.soft_abort_flag();

    let first_press = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let press_flag = first_press.clone();
    let soft_abort_for_ctrlc = soft_abort.clone();
    ctrlc::set_handler(move || {
        if soft_abort_for_ctrlc.get() && press_flag.swap(false, std::sync::atomic::Ordering::SeqCst) {
            log::info!("interrupted; finishing the current root before stopping (press again to abort immediately)");
            soft.set();
        } else {
            log::warn!("interrupted; aborting immediately");
            hard.set();
        }
    })
    .ok();

    // jdupes.c's sigusr1() flips F_SOFTABORT mid-run rather than reading it
    // once at startup; toggling an atomic is async-signal-safe, so the new
    // value is applied directly from the handler instead of through a flag
    // someone else has to remember to poll.
    #[cfg(unix)]
    {
        use signal_hook::consts::SIGUSR1;
        unsafe {
            let _ = signal_hook::low_level::register(SIGUSR1, move || {
                let enabled = soft_abort.toggle();
                log::info!("SIGUSR1: soft-abort policy now {}", if enabled { "enabled" } else { "disabled" });
            });
        }
    }
}
