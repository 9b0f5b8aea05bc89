use clap::error::ErrorKind;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = match lmake_cli::parse(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(());
        }
        Err(e) => {
            // option inconnue, valeur manquante… : code 1, comme toute autre erreur
            e.print()?;
            std::process::exit(1);
        }
    };

    lmake_cli::init_logging(cli.log_level());
    lmake_cli::run(cli)
}
