use std::sync::OnceLock;

pub const COLOR_VAR: &str = "COLOR";
pub fn should_color() -> bool {
    COLOR.get().is_some_and(|it| *it)
}

static COLOR: OnceLock<bool> = OnceLock::new();

pub fn init_logger() {
    let doit = || -> anyhow::Result<()> {
        use flexi_logger::*;

        fn format(
            w: &mut dyn std::io::Write,
            now: &mut DeferredNow,
            record: &Record,
        ) -> Result<(), std::io::Error> {
            let color = should_color();

            let line_display = record.line();
            let line_display = if let Some(line) = &line_display {
                format_args!("{}", *line)
            } else {
                format_args!("?")
            };

            let now_display = now.format("%Y-%m-%d %H:%M:%S");
            let now_display = if color {
                format_args!("\x1b[35m{now_display}\x1b[0m")
            } else {
                format_args!("{now_display}")
            };

            let level = record.level();

            let level_colored;
            let level_display = if color {
                level_colored = style(level).paint(level.to_string());
                format_args!("{level_colored}")
            } else {
                format_args!("{level}")
            };

            write!(
                w,
                "[{now_display}] {level_display} [{}:{line_display}] {}",
                record.file().unwrap_or("<unknown>"),
                record.args(),
            )
        }

        let log_spec: LogSpecification = if cfg!(debug_assertions) {
            flexi_logger::LevelFilter::Debug.into()
        } else {
            flexi_logger::LevelFilter::Info.into()
        };

        let logger = Logger::with(log_spec)
            .format(format)
            .log_to_stderr();
        std::mem::forget(logger.start()?);

        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            log::error!("{info}");
            hook(info);
        }));

        let color = std::env::var(COLOR_VAR);
        let color = match color.as_deref().unwrap_or("auto") {
            "never" | "no" | "off" | "false" => false,
            "always" | "yes" | "on" | "true" => true,
            _ => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        };
        _ = COLOR.set(color);

        Ok(())
    };
    if let Err(err) = doit() {
        eprintln!("Failed to start logger: {err}.");
    }
}
