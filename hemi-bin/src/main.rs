use hemi_core::*;

use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser, Debug)]
#[command(name = "hemi", version, about = "Drive a two-space copying heap")]
struct Cli {
    /// Total pool size in bytes, split into two halves
    #[arg(long, default_value_t = 1024)]
    pool_size: usize,
    /// Initial number of handle table slots
    #[arg(long, default_value_t = HeapConfig::default().initial_handles)]
    initial_handles: usize,
    /// Print the heap listing when done
    #[arg(long, global = true)]
    dump: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Fill a heap with three rooted ints and garbage until it collects
    Scenario,
    /// Build rooted lists, dicts and cycles while dropping old ones
    Churn {
        #[arg(long, default_value_t = 100)]
        rounds: usize,
        /// How many structures stay rooted at once
        #[arg(long, default_value_t = 2)]
        keep: usize,
    },
}

fn scenario(heap: &mut Heap) -> Result<()> {
    let mut globals = Globals::new();
    let h0 = heap.alloc_int(10, &globals)?;
    let h1 = heap.alloc_int(11, &globals)?;
    let h2 = heap.alloc_int(12, &globals)?;
    globals.bind("a", h0);
    globals.bind("c", h2);
    println!("allocated {} {} {}, rooted a = {} and c = {}", h0, h1, h2, h0, h2);

    let mut garbage = 0;
    while heap.stats().collections == 0 {
        heap.alloc_int(1000 + garbage, &globals)?;
        garbage += 1;
    }
    println!("allocated {} unrooted ints before the first collection", garbage);
    println!("a = {}, c = {}", heap.read(h0)?, heap.read(h2)?);
    match heap.read(h1) {
        Ok(v) => println!("{} was reused and now holds {}", h1, v),
        Err(e) => println!("{} is gone: {}", h1, e),
    }
    println!("{} bytes in use", heap.used_bytes());
    Ok(())
}

fn churn(heap: &mut Heap, rounds: usize, keep: usize) -> Result<()> {
    let mut globals = Globals::new();
    let keep = keep.max(1);
    for round in 0..rounds {
        let slot = format!("g{}", round % keep);
        // half-built structures hang off "tmp" so a collection can't take them
        let mut list = None;
        for i in 0..3 {
            let v = heap.alloc_int((round * 3 + i) as i64, &globals)?;
            let node = heap.alloc_list_node(Some(v), list, &globals)?;
            globals.bind("tmp", node);
            list = Some(node);
        }
        let head = heap.alloc_list_node(None, list, &globals)?;
        heap.set_ref(head, Field::Value, Some(head))?;
        globals.bind("tmp", head);

        let key = heap.alloc_string(&slot, &globals)?;
        globals.bind("tmp-key", key);
        let weight = heap.alloc_float(round as f64 / 2.0, &globals)?;
        let entry = heap.alloc_dict_node(Some(key), Some(weight), Some(head), &globals)?;
        globals.bind(&slot, entry);
        globals.unbind("tmp");
        globals.unbind("tmp-key");

        // garbage that is never rooted
        heap.alloc_string("scratch", &globals)?;
        heap.alloc_bool(round % 2 == 0, &globals)?;
    }
    let stats = heap.stats();
    let usage = heap.usage();
    println!("{} rounds, {} collections", rounds, stats.collections);
    println!("reclaimed {} bytes in total, {} handles freed", stats.total_reclaimed, stats.handles_freed);
    println!("last pause {:?}", stats.last_pause);
    println!("{} of {} bytes in use, {} live handles ({} slots)",
        usage.used, usage.half_size, usage.live_handles, usage.table_capacity);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = HeapConfig::new(cli.pool_size).with_initial_handles(cli.initial_handles);
    let mut heap = Heap::with_config(config)?;
    info!("heap ready with {} bytes per half", heap.half_size());
    match cli.command {
        Cmd::Scenario => scenario(&mut heap)?,
        Cmd::Churn { rounds, keep } => churn(&mut heap, rounds, keep)?,
    }
    if cli.dump {
        print!("{}", heap.display());
    }
    heap.cleanup();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
