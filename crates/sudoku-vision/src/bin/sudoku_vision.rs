//! Minimal CLI: train a classifier model from synthetic glyphs, or solve a
//! puzzle given as 81 digits on the command line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sudoku_vision::classifier::{
    generate_training_set, hidden_layer_size, train, write_training_artifact, GlyphSource, Network,
    GLYPH_HEIGHT, GLYPH_WIDTH, OUTPUT_CLASSES,
};
use sudoku_vision::core::GrayBuffer;
use sudoku_vision::solver::{solve, Game};

#[derive(Parser)]
#[command(name = "sudoku-vision", about = "AR Sudoku vision/reasoning core CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a digit classifier from synthetic glyphs and write the
    /// training artifact (samples + network + label alphabet) to disk.
    Train {
        #[arg(short, long, default_value = "training.bin.dat")]
        output: PathBuf,
        #[arg(long, default_value_t = 200)]
        samples_per_digit: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Solve a puzzle given as 81 characters (digits 1-9, '.' or '0' for blank).
    Solve {
        puzzle: String,
    },
}

/// A small built-in 5x7 dot-matrix font, jittered per sample. Exists only
/// to give the `train` subcommand something to bootstrap from when run
/// standalone; the library itself takes glyph rendering as a collaborator
/// rather than owning a font.
struct BlockDigitGlyphs;

const FONT_5X7: [[&str; 7]; 10] = [
    ["     ", "     ", "     ", "     ", "     ", "     ", "     "],
    ["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."],
    [".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"],
    [".###.", "#...#", "....#", "..##.", "....#", "#...#", ".###."],
    ["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."],
    ["#####", "#....", "####.", "....#", "....#", "#...#", ".###."],
    ["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."],
    ["#####", "....#", "...#.", "..#..", "..#..", "..#..", "..#.."],
    [".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."],
    [".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."],
];

const BACKGROUND: u8 = 10;
const FOREGROUND: u8 = 240;

impl GlyphSource for BlockDigitGlyphs {
    fn render_digit(&mut self, digit: u8, rng: &mut dyn RngCore) -> GrayBuffer {
        let font = &FONT_5X7[digit as usize];
        let dx: i64 = rng.gen_range(-1..=1);
        let dy: i64 = rng.gen_range(-1..=1);

        let mut data = vec![BACKGROUND; GLYPH_WIDTH * GLYPH_HEIGHT];
        for y in 0..GLYPH_HEIGHT {
            for x in 0..GLYPH_WIDTH {
                let fx = (x as i64 - dx) * 5 / GLYPH_WIDTH as i64;
                let fy = (y as i64 - dy) * 7 / GLYPH_HEIGHT as i64;
                if fx < 0 || fy < 0 || fx >= 5 || fy >= 7 {
                    continue;
                }
                let on = font[fy as usize].as_bytes()[fx as usize] == b'#';
                if on {
                    data[y * GLYPH_WIDTH + x] = FOREGROUND;
                }
                if rng.gen::<f32>() < 0.02 {
                    data[y * GLYPH_WIDTH + x] = data[y * GLYPH_WIDTH + x].saturating_sub(30);
                }
            }
        }
        GrayBuffer::new(GLYPH_WIDTH, GLYPH_HEIGHT, data)
    }
}

fn run_train(output: PathBuf, samples_per_digit: usize, seed: u64) -> std::io::Result<()> {
    let mut source = BlockDigitGlyphs;
    let samples = generate_training_set(&mut source, seed, samples_per_digit);
    info!("generated {} training samples", samples.len());

    let input_size = GLYPH_WIDTH * GLYPH_HEIGHT;
    let hidden_size = hidden_layer_size(input_size);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut net = Network::random(&[input_size, hidden_size, OUTPUT_CLASSES], &mut rng);

    let choices: Vec<u8> = (0..OUTPUT_CLASSES as u8).collect();
    let mut persist_error = None;
    let mut epoch = 0usize;

    train(&mut net, &samples, |net| {
        epoch += 1;
        info!("epoch {epoch} complete, persisting to {}", output.display());
        if let Err(e) = persist(&output, &samples, net, &choices) {
            persist_error = Some(e);
        }
    });

    if let Some(e) = persist_error {
        return Err(e);
    }
    Ok(())
}

fn persist(
    output: &PathBuf,
    samples: &[sudoku_vision::classifier::TrainingSample],
    net: &Network,
    choices: &[u8],
) -> std::io::Result<()> {
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    write_training_artifact(&mut writer, samples, net, choices)?;
    writer.flush()
}

fn run_solve(puzzle: &str) {
    let cleaned: Vec<u8> = puzzle
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '.' { 0 } else { c.to_digit(10).unwrap_or(0) as u8 })
        .collect();

    if cleaned.len() != 81 {
        eprintln!("expected 81 digits (got {}), using '.' or '0' for blanks", cleaned.len());
        std::process::exit(1);
    }

    let mut cells = [0u8; 81];
    cells.copy_from_slice(&cleaned);
    let givens = Game::from_array(cells);

    match solve(&givens) {
        Some(solution) => {
            for row in 0..9 {
                let line: String = (0..9)
                    .map(|col| std::char::from_digit(solution.get(row, col) as u32, 10).unwrap())
                    .collect();
                println!("{line}");
            }
        }
        None => {
            eprintln!("no solution");
            std::process::exit(1);
        }
    }
}

fn main() {
    let _ = sudoku_vision::core::logger::init_with_level(LevelFilter::Info);

    let cli = Cli::parse();
    match cli.command {
        Command::Train { output, samples_per_digit, seed } => {
            if let Err(e) = run_train(output, samples_per_digit, seed) {
                eprintln!("training failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Solve { puzzle } => run_solve(&puzzle),
    }
}
