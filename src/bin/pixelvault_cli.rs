//! PixelVault CLI: hide a file inside a PNG, or recover it.
//! Build with: cargo build --release --bin pixelvault-cli

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pixelvault_lib::stego::{is_supported_image_name, SUPPORTED_IMAGE_EXTENSIONS};
use pixelvault_lib::{Codec, CodecConfig, ConvertOutcome, Direction};

/// Set to `1` to accept images whose checksum does not match.
const DISABLE_CHECKSUM_ENV: &str = "PIXELVAULT_DISABLE_CHECKSUM";

fn usage() -> &'static str {
    r#"pixelvault-cli — hide encrypted files in images

Usage:
  pixelvault-cli encode <input> --key <key> [-o <out.png>] [--carrier <image>]
                        [--aspect AUTO|SQUARE|SMALLSCREEN|WIDESCREEN|W:H]
                        [--channel RED|GREEN|BLUE|ALPHA] [--level -1..9]
                        [--name <original name>] [--fallback] [--json]
  pixelvault-cli decode <image> --key <key> [-o <out>] [--channel RED|GREEN|BLUE|ALPHA]
                        [--no-checksum] [--fallback] [--json]

Encode:
  Compresses, checksums and encrypts <input>, then writes it into one color
  channel of a PNG. Without -o the image is named after the input file.
  --carrier <image>      Cover image, resized to fit the data
  --name <name>          File name stored in the image (default: input file name)
  --fallback             Use the compatibility cipher (weaker IV)

Decode:
  Reads the hidden file back. Without -o it is written to the current
  directory under the file name stored in the image (or output.dat).
  --no-checksum          Skip checksum validation (also: PIXELVAULT_DISABLE_CHECKSUM=1)

--json prints a summary of the conversion to stdout. Log level: RUST_LOG.
"#
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", usage());
        std::process::exit(1);
    }
    let sub = &args[1];
    let direction = match sub.as_str() {
        "encode" => Direction::Encode,
        "decode" => Direction::Decode,
        "-h" | "--help" | "help" => {
            println!("{}", usage());
            return;
        }
        _ => {
            eprintln!("{}", usage());
            std::process::exit(1);
        }
    };
    if let Err(e) = run(direction, &args[2..]) {
        eprintln!("{} error: {}", sub, e);
        std::process::exit(1);
    }
}

#[derive(Default)]
struct Options {
    input: Option<String>,
    output: Option<String>,
    carrier: Option<String>,
    key: Option<String>,
    aspect: Option<String>,
    channel: Option<String>,
    level: Option<i32>,
    name: Option<String>,
    fallback: bool,
    no_checksum: bool,
    json: bool,
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        let mut value = |flag: &str| -> Result<String, String> {
            i += 1;
            args.get(i).cloned().ok_or(format!("missing value for {}", flag))
        };
        match a.as_str() {
            "-o" | "--output" => opts.output = Some(value(a)?),
            "--carrier" => opts.carrier = Some(value(a)?),
            "--key" => opts.key = Some(value(a)?),
            "--aspect" => opts.aspect = Some(value(a)?),
            "--channel" => opts.channel = Some(value(a)?),
            "--name" => opts.name = Some(value(a)?),
            "--level" => {
                let v = value(a)?;
                opts.level = Some(v.trim().parse().map_err(|_| format!("invalid --level '{}'", v))?);
            }
            "--fallback" => opts.fallback = true,
            "--no-checksum" => opts.no_checksum = true,
            "--json" => opts.json = true,
            _ if !a.starts_with('-') && opts.input.is_none() => opts.input = Some(a.clone()),
            _ => return Err(format!("unknown argument '{}'", a)),
        }
        i += 1;
    }
    Ok(opts)
}

fn checksum_disabled_by_env() -> bool {
    env::var(DISABLE_CHECKSUM_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn require_image_name(path: &str, what: &str) -> Result<(), String> {
    if is_supported_image_name(path) {
        Ok(())
    } else {
        Err(format!(
            "{} must be one of: {}",
            what,
            SUPPORTED_IMAGE_EXTENSIONS.join(", ")
        ))
    }
}

/// Keeps only the last path component of a name read from an image.
fn safe_file_name(name: &str) -> PathBuf {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(pixelvault_lib::codec::DEFAULT_PAYLOAD_NAME))
}

fn run(direction: Direction, args: &[String]) -> Result<(), String> {
    let opts = parse_options(args)?;
    let input_path = opts.input.as_deref().ok_or(match direction {
        Direction::Encode => "encode requires <input>",
        Direction::Decode => "decode requires <image>",
    })?;
    let key = opts.key.as_deref().ok_or("--key is required")?;

    let mut builder = CodecConfig::builder()
        .direction(direction)
        .encryption_key(key)
        .use_fallback_cipher(opts.fallback)
        .validate_checksum(!(opts.no_checksum || checksum_disabled_by_env()));
    if let Some(aspect) = &opts.aspect {
        builder = builder.aspect_ratio_str(aspect);
    }
    if let Some(channel) = &opts.channel {
        builder = builder.channel_str(channel);
    }
    if let Some(level) = opts.level {
        builder = builder.compression_level(level);
    }

    let carrier = match (&direction, &opts.carrier) {
        (Direction::Encode, Some(path)) => {
            require_image_name(path, "carrier")?;
            Some(fs::read(path).map_err(|e| format!("{}: {}", path, e))?)
        }
        _ => None,
    };
    if direction == Direction::Decode {
        require_image_name(input_path, "input image")?;
    } else {
        let name = opts.name.clone().or_else(|| {
            Path::new(input_path)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        });
        builder = builder.original_filename(name.as_deref());
    }

    let config = builder.build().map_err(|e| e.to_string())?;
    let input = fs::read(input_path).map_err(|e| format!("{}: {}", input_path, e))?;

    let result = Codec::new(config).convert(&input, carrier.as_deref());
    if opts.json {
        let outcome = ConvertOutcome::from_result(direction, &result);
        let json = serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())?;
        io::stdout().write_all(json.as_bytes()).map_err(|e| e.to_string())?;
        io::stdout().write_all(b"\n").map_err(|e| e.to_string())?;
    }
    let conversion = result.map_err(|e| e.to_string())?;

    let output_path = match &opts.output {
        Some(path) => PathBuf::from(path),
        None => safe_file_name(&conversion.file_name),
    };
    fs::write(&output_path, &conversion.bytes).map_err(|e| format!("{}: {}", output_path.display(), e))?;
    eprintln!("Wrote {}", output_path.display());
    Ok(())
}
