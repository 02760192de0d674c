use clap::Parser;
use color_eyre::Result;
use parqtui::{load_app_config, App, AppConfig, AppEvent, APP_NAME};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::sync::mpsc::channel;

#[derive(Parser, Debug)]
#[command(version, about = "parqtui - Parquet viewing in the terminal")]
struct Args {
    /// Parquet file to open at startup
    path: Option<PathBuf>,

    /// Ignore the user config file and use defaults
    #[arg(long = "no-config", action)]
    no_config: bool,

    /// Rows fetched per page, overriding the config file
    /// (default: sized to the viewport)
    #[arg(long = "page-size", value_name = "ROWS")]
    page_size: Option<usize>,
}

fn config_for(args: &Args) -> AppConfig {
    let mut config = if args.no_config {
        AppConfig::default()
    } else {
        load_app_config(APP_NAME)
    };
    if let Some(page_size) = args.page_size {
        config.display.page_size = page_size;
    }
    config
}

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, args: &Args) -> Result<()> {
    let config = config_for(args);

    let (tx, rx) = channel::<AppEvent>();
    let mut app = App::new_with_config(tx.clone(), config);
    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Init)?;
    if let Some(path) = &args.path {
        tx.send(AppEvent::Open(path.clone()))?;
    }

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = run(terminal, &args);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
