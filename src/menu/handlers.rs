use crate::component::ChunkedResizer;
use crate::component::chunked_resize::Experiment;
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn run_experiment(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
    experiment: Experiment,
) -> Result<()> {
    // 上一次的 Ctrl-C 只作用在當時的流程
    shutdown_signal.store(false, Ordering::SeqCst);

    let resizer = ChunkedResizer::new(config.clone(), Arc::clone(shutdown_signal));

    if let Err(e) = resizer.run(experiment) {
        eprintln!("{} {}", style("錯誤:").red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
