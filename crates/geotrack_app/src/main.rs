mod app;
mod log_view;
mod logging;

fn main() -> anyhow::Result<()> {
    app::run()
}
