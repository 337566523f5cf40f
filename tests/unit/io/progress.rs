//! Tests for phase progress bars

#[cfg(test)]
mod tests {
    use truman::io::progress::ProgressManager;

    // Tests phase bars track their own length and position
    // Verified by sharing one bar across phases
    #[test]
    fn test_phases_are_independent() {
        let pm = ProgressManager::hidden();

        let indexing = pm.phase("Indexing");
        let assembling = pm.phase("Assembling");
        indexing.set_length(3);
        indexing.inc(2);
        assembling.set_length(10);

        assert_eq!(indexing.position(), 2);
        assert_eq!(indexing.length(), Some(3));
        assert_eq!(assembling.position(), 0);
        assert_eq!(assembling.message(), "Assembling");

        indexing.finish();
        assembling.finish();
        pm.finish();
    }

    // Tests default construction behaves like new
    // Verified by panicking in Default
    #[test]
    fn test_progress_manager_default() {
        let pm = ProgressManager::default();
        let bar = pm.phase("Indexing");
        bar.inc(1);
        assert_eq!(bar.position(), 1);
        pm.finish();
    }

    // Tests bars start empty until a phase sets its length
    // Verified by starting bars at length 1
    #[test]
    fn test_phase_starts_empty() {
        let pm = ProgressManager::hidden();
        let bar = pm.phase("Indexing");

        assert_eq!(bar.length(), Some(0));
        assert_eq!(bar.position(), 0);
    }
}
