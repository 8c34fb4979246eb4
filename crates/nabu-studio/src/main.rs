use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::{Context, Result};
use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_ui::prelude::*;

/// Demo settings, read from the environment.
#[derive(Debug, Clone)]
struct StudioConfig {
    /// Worker threads feeding the option source (`NABU_WORKERS`).
    workers: usize,
    /// Options each worker adds (`NABU_OPTIONS`).
    options_per_worker: usize,
}

impl StudioConfig {
    fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("NABU_WORKERS") {
            config.workers = v.parse().with_context(|| format!("NABU_WORKERS must be a number, got '{v}'"))?;
        }
        if let Ok(v) = std::env::var("NABU_OPTIONS") {
            config.options_per_worker =
                v.parse().with_context(|| format!("NABU_OPTIONS must be a number, got '{v}'"))?;
        }
        Ok(config)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self { workers: 3, options_per_worker: 4 }
    }
}

/// Source element for the dropdown.
#[derive(Debug, Clone)]
struct Station {
    worker: usize,
    index: usize,
}

impl From<Station> for DropdownOption {
    fn from(s: Station) -> Self {
        DropdownOption::new(format!("station {}-{}", s.worker, s.index))
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let config = StudioConfig::from_env()?;

    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║            NABU STUDIO v0.1            ║");
    println!("  ║   in-memory host  ·  nabu-ui binding   ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    let (dispatcher, dispatch_thread) = Dispatcher::spawn(DispatcherConfig::default().thread_name("studio-dispatch"))?;
    let host = MemoryHost::new();
    let bridge = NativeBridge::new(dispatcher, host.clone());

    // ── Dropdown fed by workers ───────────────────────────────────────────
    let stations = ObservableList::<Station>::new();
    let dropdown = Dropdown::<Station>::new(&bridge).context("failed to create dropdown")?;
    dropdown.set_item_template(Some(
        Template::new("station", |s: &Station| {
            DropdownOption::new(format!("Station {}.{}", s.worker, s.index)).image(format!("icons/worker-{}.png", s.worker))
        })
        .into(),
    ))?;
    dropdown.set_items_source(Some(&stations))?;
    let _selection = dropdown.value().subscribe(|index| log::info!("selected option {index}"));

    let workers: Vec<_> = (0..config.workers)
        .map(|worker| {
            let stations = stations.clone();
            let count = config.options_per_worker;
            thread::spawn(move || {
                for index in 0..count {
                    stations.push(Station { worker, index });
                }
            })
        })
        .collect();
    for worker in workers {
        if worker.join().is_err() {
            log::error!("a station worker panicked");
        }
    }
    dropdown.engine_value_changed(i64::MAX);

    // ── Event trigger ─────────────────────────────────────────────────────
    let trigger = EventTrigger::new(&bridge).context("failed to create event trigger")?;
    let launches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&launches);
    trigger.add_entry(
        TriggerEntry::new(&bridge, "launch")?.on_fire(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            println!("  [TRIGGER] {event}");
        }),
    )?;
    trigger.add_entry(TriggerEntry::new(&bridge, "abort")?)?;
    trigger.fire("launch");

    // ── Summary ───────────────────────────────────────────────────────────
    let options = dropdown.mirror().read()?;
    let handle = dropdown.native().handle();
    println!("  Dropdown {handle}");
    println!("    options      {}", options.len());
    println!("    selected     {}", dropdown.value().get());
    if let Some(option) = dropdown.selected() {
        println!("    label        {}", option.text);
    }
    println!("    dirty hints  {}", host.dirty_count(handle));
    println!("  EventTrigger {}", trigger.native().handle());
    println!("    entries      {}", trigger.mirror().read()?.len());
    println!("    launches     {}", launches.load(Ordering::SeqCst));
    println!("  Host");
    println!("    live objects {}", host.live_count());
    println!("    host calls   {}", host.journal().len());
    println!();

    drop(trigger);
    drop(dropdown);
    dispatch_thread.shutdown()?;
    log::info!("studio finished, {} objects left alive", host.live_count());
    Ok(())
}
