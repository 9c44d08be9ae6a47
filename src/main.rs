use std::path::PathBuf;

#[derive(Debug, Default)]
struct CliArgs {
    preload: Vec<PathBuf>,
    null_audio: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = parse_args(std::env::args().skip(1).collect())?;

    tunedeck::app::run_with_startup(tunedeck::app::AppStartupOptions {
        preload: args.preload,
        null_audio: args.null_audio,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--null-audio" => out.null_audio = true,
            "--add" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--add requires a file or folder path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--add cannot be empty");
                }
                out.preload.push(PathBuf::from(value.trim()));
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("TuneDeck");
    println!("  --add <path>      Add a file or folder to the default playlist (repeatable)");
    println!("  --null-audio      Run without opening an audio output device");
    println!("  Type `help` at the prompt for playback commands.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_repeatable() {
        let args = parse_args(vec![
            String::from("--add"),
            String::from("a.mp3"),
            String::from("--null-audio"),
            String::from("--add"),
            String::from("albums"),
        ])
        .expect("parse");
        assert_eq!(
            args.preload,
            vec![PathBuf::from("a.mp3"), PathBuf::from("albums")]
        );
        assert!(args.null_audio);
    }

    #[test]
    fn add_without_value_is_rejected() {
        let err = parse_args(vec![String::from("--add")]).expect_err("error");
        assert!(err.to_string().contains("--add requires"));
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(parse_args(vec![String::from("--host")]).is_err());
    }
}
