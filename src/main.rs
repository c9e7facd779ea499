fn main() -> std::process::ExitCode {
    dr_assess_lib::run()
}
