use std::process::ExitCode;

fn main() -> ExitCode {
    powerhouse_planner::run()
}
