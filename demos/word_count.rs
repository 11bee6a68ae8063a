//! Counts the words of a text file and lists them by ascending frequency.
//!
//! Usage: `cargo run --example word_count -- <file> [log-level]`

use std::env;
use std::fs;
use std::io;
use std::process;

use balanced_tree::{BalancedTree, Error};
use log::{debug, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Builds a dictionary of whitespace-delimited words and their number of occurrences.
fn counter(text: &str) -> BalancedTree<String, usize> {
    let mut dict = BalancedTree::new();
    for word in text.split_whitespace() {
        let word = word.to_string();
        match dict.find_mut(&word) {
            Ok(count) => *count += 1,
            Err(Error::KeyNotFound) => {
                debug!("new word {:?}", word);
                dict.insert(word, 1);
            }
        }
    }
    dict
}

/// Returns the entries of the dictionary sorted by count, then by word.
fn listing(dict: &BalancedTree<String, usize>) -> Vec<(String, usize)> {
    let mut elements = dict.elements();
    elements.sort_by(|lhs, rhs| lhs.1.cmp(&rhs.1).then_with(|| lhs.0.cmp(&rhs.0)));
    elements
}

fn main() -> io::Result<()> {
    let mut args = env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: word_count <file> [log-level]");
            process::exit(2);
        }
    };
    let level = args
        .next()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Warn);
    let logger = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
    if let Err(err) = logger {
        eprintln!("failed to initialize logging: {}", err);
    }

    let text = fs::read_to_string(&path)?;
    let dict = counter(&text);
    info!(
        "{}: {} distinct words, tree height {}",
        path,
        dict.count(),
        dict.height()
    );

    for (word, count) in listing(&dict) {
        println!("{}: {}", word, count);
    }
    Ok(())
}
