fn main() -> anyhow::Result<()> {
    readtimer_lib::run()
}
