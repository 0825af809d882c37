use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "fieldlab",
    author,
    version,
    about = "Interactive GPU field demos",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Demo to run.
    #[arg(value_enum, default_value_t = Demo::Ripple)]
    pub demo: Demo,

    /// Lattice side for the grid demos (element count is side squared).
    #[arg(long, value_name = "CELLS")]
    pub side: Option<u32>,

    /// Seed for per-element randomness and the click probe.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Image backing the grid demos; a procedural gradient is used when
    /// omitted.
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Target image the dissolve demo fades toward.
    #[arg(long, value_name = "PATH")]
    pub image_target: Option<PathBuf>,

    /// Settings TOML overriding demo uniforms.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Demo {
    /// Spring-relaxation mesh with a pointer pinch.
    Jelly,
    /// Click-driven wavefront reveal over an image lattice.
    Ripple,
    /// Noise-staggered dissolve between two images.
    Dissolve,
}

impl Demo {
    pub fn settings_key(self) -> &'static str {
        match self {
            Demo::Jelly => "jelly",
            Demo::Ripple => "ripple",
            Demo::Dissolve => "dissolve",
        }
    }
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: u32 = width
        .parse()
        .map_err(|_| format!("invalid width '{width}'"))?;
    let height: u32 = height
        .parse()
        .map_err(|_| format!("invalid height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("window size must be nonzero".to_string());
    }
    Ok((width, height))
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ripple() {
        let cli = Cli::parse_from(["fieldlab"]);
        assert_eq!(cli.demo, Demo::Ripple);
        assert_eq!(cli.seed, 0);
    }

    #[test]
    fn parses_demo_and_size() {
        let cli = Cli::parse_from(["fieldlab", "dissolve", "--size", "800x600", "--side", "64"]);
        assert_eq!(cli.demo, Demo::Dissolve);
        assert_eq!(cli.size, Some((800, 600)));
        assert_eq!(cli.side, Some(64));
    }

    #[test]
    fn rejects_malformed_size() {
        assert!(Cli::try_parse_from(["fieldlab", "--size", "800"]).is_err());
        assert!(Cli::try_parse_from(["fieldlab", "--size", "0x600"]).is_err());
    }
}
