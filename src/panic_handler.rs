use log::error;
use std::panic;

/// Install pretty backtraces and make sure panics reach the log file.
///
/// Worker threads log to the same file, so a panic on any thread shows up
/// next to the render that caused it.
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        error!("Panic on thread {name}: {panic_info}");
        log::logger().flush();

        default_hook(panic_info);
    }));
}
