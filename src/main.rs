fn main() -> anyhow::Result<()> {
    focustimer_lib::run()
}
