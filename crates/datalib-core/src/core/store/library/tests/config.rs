use super::*;
use crate::core::config::{ENV_PUT_CONFLICT, ENV_STORE_PATH};
use serial_test::serial;

#[test]
#[serial]
fn library_opens_where_the_environment_points() -> Result<()> {
    let temp = tempdir()?;
    let root = temp.path().join("from-env");
    let _root = EnvVarGuard::set(ENV_STORE_PATH, &root.display().to_string());
    let _policy = EnvVarGuard::set(ENV_PUT_CONFLICT, "reject");

    let config = LibraryConfig::from_env()?;
    assert_eq!(config.root(), root);
    let library = DataLibrary::open(&config)?;
    library.put("env", b"configured")?;
    assert!(root.join(INDEX_FILENAME).is_file());
    assert!(library.put("env", b"other").is_err(), "reject policy applied");
    Ok(())
}
