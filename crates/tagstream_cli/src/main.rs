mod args;

use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use args::{CliArgs, Command};
use clap::Parser;
use tagstream_core::{DecodeHooks, Decoder, Options, Result, Value};

fn main() -> ExitCode {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&filters)
        .init();

    let args = CliArgs::parse();
    let result = args.stream.options().and_then(|options| match &args.command {
        Command::Dump { file, pretty } => dump(file, options, *pretty),
        Command::Stats { file } => stats(file, options),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn dump(path: &Path, options: Options, pretty: bool) -> Result<()> {
    let dec = Decoder::open(path, options, DecodeHooks::default())?;
    log::debug!("stream version {}", dec.version());

    for value in dec.into_values() {
        let value = value?;
        match pretty {
            true => println!("{value:#?}"),
            false => println!("{value:?}"),
        }
    }
    Ok(())
}

fn stats(path: &Path, options: Options) -> Result<()> {
    let start = Instant::now();
    let dec = Decoder::open(path, options, DecodeHooks::default())?;

    let mut count = 0usize;
    let mut histogram = BTreeMap::new();
    for value in dec.into_values() {
        count_nodes(&value?, &mut histogram);
        count += 1;
    }
    let elapsed = start.elapsed();

    println!("{}: {count} values", path.display());
    for (name, n) in &histogram {
        println!("{name:>20} {n}");
    }
    log::info!("decoded in {}", humantime::format_duration(elapsed));
    Ok(())
}

/// Counts `value` and everything nested inside it by variant name.
fn count_nodes(value: &Value, histogram: &mut BTreeMap<&'static str, usize>) {
    *histogram.entry(value.type_name()).or_default() += 1;

    match value {
        Value::Vector(items)
        | Value::Set(items)
        | Value::SortedSet(items)
        | Value::List(items)
        | Value::Seq(items)
        | Value::Iterable(items)
        | Value::GenericList(items)
        | Value::ObjectArray(items) => {
            items.iter().for_each(|v| count_nodes(v, histogram));
        }
        Value::Queue(items) => items.iter().for_each(|v| count_nodes(v, histogram)),
        Value::Map(map) | Value::SortedMap(map) | Value::GenericMap(map) => {
            for (k, v) in map {
                count_nodes(k, histogram);
                count_nodes(v, histogram);
            }
        }
        Value::MapEntry(k, v) => {
            count_nodes(k, histogram);
            count_nodes(v, histogram);
        }
        Value::Atom(inner) | Value::Ref(inner) => count_nodes(inner, histogram),
        Value::WithMeta { value, .. } => count_nodes(value, histogram),
        Value::Future(deferred) => {
            if let Some(inner) = deferred.peek() {
                count_nodes(&inner, histogram);
            }
        }
        _ => {}
    }
}
