//! Command-line tool to convert SVG documents to PDF, PNG, PostScript or SVG.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use pagesvg::convert_only::{Parse, Rgba};
use pagesvg::{Document, Options, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "pagesvg-convert", version, about = "Convert SVG files to other formats")]
struct Args {
    /// Input filename or URL, or "-" for standard input
    input: String,

    /// Output format: pdf, png, ps or svg [default: from the output extension, or pdf]
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Ratio between 1 inch and 1 pixel
    #[arg(short, long, default_value_t = 96.0)]
    dpi: f64,

    /// Width of the parent container in pixels
    #[arg(short = 'W', long = "width")]
    parent_width: Option<f64>,

    /// Height of the parent container in pixels
    #[arg(short = 'H', long = "height")]
    parent_height: Option<f64>,

    /// Output scaling factor
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Resolve XML entities and allow very large files and any reference
    /// (WARNING: vulnerable to XXE attacks and various DoS)
    #[arg(short = 'u', long = "unsafe")]
    unsafe_mode: bool,

    /// Desired output width in pixels
    #[arg(long)]
    output_width: Option<f64>,

    /// Desired output height in pixels
    #[arg(long)]
    output_height: Option<f64>,

    /// Background color, in CSS syntax
    #[arg(short = 'b', long = "background-color", value_parser = parse_color)]
    background_color: Option<Rgba>,

    /// Invert all the colors
    #[arg(short = 'n', long)]
    negate_colors: bool,

    /// Invert the colors of raster images
    #[arg(short = 'i', long)]
    invert_images: bool,

    /// Output filename, or "-" for standard output
    #[arg(short, long, default_value = "-")]
    output: String,
}

fn parse_color(s: &str) -> Result<Rgba, String> {
    Rgba::parse_str(s).map_err(|_| format!("invalid color \"{}\"", s))
}

impl Args {
    fn format(&self) -> OutputFormat {
        self.format
            .or_else(|| {
                Path::new(&self.output)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(OutputFormat::from_extension)
            })
            .unwrap_or(OutputFormat::Pdf)
    }

    fn options(&self) -> Options {
        Options::new()
            .with_dpi(self.dpi)
            .with_parent_size(self.parent_width, self.parent_height)
            .with_scale(self.scale)
            .with_unsafe(self.unsafe_mode)
            .with_output_size(self.output_width, self.output_height)
            .with_background_color(self.background_color)
            .with_negate_colors(self.negate_colors)
            .with_invert_images(self.invert_images)
    }
}

fn load(options: &Options, input: &str) -> Result<Document> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut data)
            .context("could not read standard input")?;

        return options
            .load_bytes(data, None)
            .context("could not load standard input");
    }

    match Url::parse(input) {
        // One-letter schemes are Windows drive letters.
        Ok(url) if url.scheme().len() > 1 => options
            .load_url(&url)
            .with_context(|| format!("could not load {}", input)),

        _ => options
            .load_path(input)
            .with_context(|| format!("could not load {}", input)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let format = args.format();
    let options = args.options();
    let document = load(&options, &args.input)?;

    if args.output == "-" {
        let data = pagesvg::convert(&document, options.config(), format, Vec::new())
            .with_context(|| format!("could not render {}", args.input))?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(&data).context("could not write to standard output")?;
        stdout.flush()?;
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("could not create {}", args.output))?;

        let mut writer = pagesvg::convert(&document, options.config(), format, BufWriter::new(file))
            .with_context(|| format!("could not render {}", args.input))?;

        writer
            .flush()
            .with_context(|| format!("could not write {}", args.output))?;
    }

    Ok(())
}
