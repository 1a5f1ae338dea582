#![cfg(all(feature = "i2cdev", target_os = "linux"))]

use std::io;

use i2cbus::{BusConfig, BusError, BusHandle, I2cDev, LockRegistry, Phase};

#[test]
fn device_path_uses_prefix() {
    assert_eq!(I2cDev::new().device_path(1), "/dev/i2c-1");
    assert_eq!(I2cDev::with_prefix("/tmp/i2c-").device_path(3), "/tmp/i2c-3");
}

#[test]
fn missing_device_fails_open() {
    let registry = LockRegistry::new(BusConfig::default());
    let transport = I2cDev::with_prefix("/nonexistent/i2cbus-test/i2c-");

    let result = BusHandle::open(&registry, &transport, 0, 0x48);
    match result {
        Err(BusError::TransportOpen(err)) => {
            assert_eq!(err.kind(), io::ErrorKind::NotFound)
        }
        other => panic!("unexpected open result: {other:?}"),
    }
    assert_eq!(registry.user_count(), 0);
    assert_eq!(registry.phase(), Phase::Idle);
}

#[test]
fn slave_ioctl_rejected_on_plain_file() {
    let dir = std::env::temp_dir().join(format!(
        "i2cbus-test-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("i2c-0"), b"").unwrap();
    let prefix = format!("{}/i2c-", dir.display());

    let registry = LockRegistry::new(BusConfig::default());
    let transport = I2cDev::with_prefix(prefix);
    let result = BusHandle::open(&registry, &transport, 0, 0x48);

    assert!(matches!(result, Err(BusError::TransportOpen(_))));
    assert_eq!(registry.user_count(), 0);
    std::fs::remove_dir_all(&dir).unwrap();
}
