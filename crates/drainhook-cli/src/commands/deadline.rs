use drainhook_core::ParameterBag;
use drainhook_steps::check_deadline;
use tracing::info;

pub fn run(input_path: &str, now: Option<&str>) -> anyhow::Result<()> {
    let mut bag = ParameterBag::from_json(&super::read_input(input_path)?)?;
    let now = super::now(now)?;

    let past = check_deadline(&mut bag, now)?;
    info!(deadline = bag.deadline.as_deref().unwrap_or_default(), past, "deadline checked");
    println!("{}", bag.to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_bag_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"EC2InstanceID": "i-1", "Deadline": "2024-01-01T00:00:00Z"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        run(path, Some("2024-01-01T00:00:05Z")).unwrap();
        assert!(run(path, Some("not a time")).is_err());
    }

    #[test]
    fn bag_without_deadline_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"EC2InstanceID": "i-1"}}"#).unwrap();
        let err = run(file.path().to_str().unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("Deadline"));
    }
}
