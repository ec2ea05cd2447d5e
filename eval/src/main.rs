use std::process::ExitCode;

use log::{error, info};
use nano_iris_eval::{report, run, EvalConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match EvalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let evaluation = match run(&config) {
        Ok(evaluation) => evaluation,
        Err(e) => {
            error!("evaluation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    print!("{}", report::render(&evaluation));

    if config.idle_after_run {
        info!("evaluation finished, idling");
        loop {
            std::thread::park();
        }
    }
    ExitCode::SUCCESS
}
