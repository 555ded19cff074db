fn main() -> anyhow::Result<()> {
    timetable_ics_lib::run()
}
