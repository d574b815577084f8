// Performance measurement for Llrb instances. Measure:
// * Initial load of a shuffled data set.
// * Lookup of every value, in a different shuffled order.
// * Remove of every value, in yet another shuffled order.
// * Walk with a cursor, removing each value right after it is returned.
//
// Each phase is repeated `loops` times and the average is logged.
//
// Usage: llrb-set [size] [loops], log level from LLRB_LOG env variable.

use std::{
    env, process,
    time::{Duration, Instant},
};

use log::{error, info, LevelFilter};
use rand::{seq::SliceRandom, thread_rng};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use llrb_set::Llrb;

const DEFAULT_SIZE: usize = 1_000_000;
const DEFAULT_LOOPS: usize = 4;

fn main() {
    let level = env::var("LLRB_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    if let Err(err) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger: {}", err);
    }

    let args: Vec<String> = env::args().collect();
    let size = match parse_arg(&args, 1, DEFAULT_SIZE) {
        Ok(size) => size,
        Err(msg) => fail(msg),
    };
    let loops = match parse_arg(&args, 2, DEFAULT_LOOPS) {
        Ok(loops) if loops > 0 => loops,
        Ok(_) => fail("loops must be non-zero".to_string()),
        Err(msg) => fail(msg),
    };

    let mut rng = thread_rng();
    let mut data: Vec<u64> = (0..size as u64).collect();
    info!("data set size:{} loops:{}", size, loops);

    let mut llrb: Llrb<u64> = Llrb::new("perf");
    let (mut load, mut find) = (Duration::default(), Duration::default());
    let (mut remove, mut walk) = (Duration::default(), Duration::default());
    for _ in 0..loops {
        data.shuffle(&mut rng);
        load += populate(&mut llrb, &data);

        data.shuffle(&mut rng);
        find += lookup(&llrb, &data);

        data.shuffle(&mut rng);
        remove += depopulate(&mut llrb, &data);

        populate(&mut llrb, &data);
        walk += drain(&mut llrb);
    }

    let n = loops as u32;
    info!("populate avg {:?}", load / n);
    info!("find     avg {:?}", find / n);
    info!("remove   avg {:?}", remove / n);
    info!("drain    avg {:?}", walk / n);

    populate(&mut llrb, &data);
    match llrb.validate() {
        Ok(stats) => {
            info!("height {} blacks {:?}", llrb.height(), stats.blacks());
            if let Some(depths) = stats.depths() {
                depths.pretty_print("");
            }
        }
        Err(err) => {
            error!("validate failed: {}", err);
            process::exit(1);
        }
    }
}

fn parse_arg(args: &[String], off: usize, default: usize) -> Result<usize, String> {
    match args.get(off) {
        None => Ok(default),
        Some(arg) => arg
            .replace('_', "")
            .parse::<usize>()
            .map_err(|err| format!("invalid argument {:?}: {}", arg, err)),
    }
}

fn fail(msg: String) -> ! {
    error!("{}", msg);
    process::exit(2)
}

fn populate(llrb: &mut Llrb<u64>, data: &[u64]) -> Duration {
    let start = Instant::now();
    for value in data.iter() {
        llrb.add(*value);
    }
    start.elapsed()
}

fn lookup(llrb: &Llrb<u64>, data: &[u64]) -> Duration {
    let start = Instant::now();
    for value in data.iter() {
        if !llrb.contains(value) {
            fail(format!("failed to find {}", value));
        }
    }
    start.elapsed()
}

fn depopulate(llrb: &mut Llrb<u64>, data: &[u64]) -> Duration {
    let start = Instant::now();
    for value in data.iter() {
        llrb.remove(value);
    }
    start.elapsed()
}

fn drain(llrb: &mut Llrb<u64>) -> Duration {
    let start = Instant::now();
    let mut cursor = llrb.cursor();
    while let Some(value) = cursor.advance(llrb).copied() {
        llrb.remove(&value);
    }
    start.elapsed()
}
