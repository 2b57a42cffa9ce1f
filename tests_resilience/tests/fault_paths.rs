//! Fault Path Tests
//!
//! Transfer faults and lifecycle faults are local: they are reported to the
//! caller and leave the store and cursor untouched.

use hal::{CopyFault, UserBuffer, UserSlice};
use services_device_manager::{errno, DenyAllDevices, DeviceManager};
use services_logger::{KernelLog, LogLevel};
use services_scull::{
    FaultPolicy, FaultyUserBuffer, ModuleError, ScullConfig, ScullError, ScullModule, Whence,
};
use tests_resilience::test_bootstrap;

/// Test: a faulting write leaves the store unchanged
#[test]
fn test_write_fault_leaves_store_unchanged() {
    let (manager, module, _log) = test_bootstrap(32);
    let mut file = manager.open(module.dev()).unwrap();
    file.write(b"pristine").unwrap();
    file.seek(0, Whence::SEEK_SET).unwrap();

    let data = *b"clobber!";
    let mut source = FaultyUserBuffer::new(UserSlice::new(&data), FaultPolicy::Always)
        .with_fault(CopyFault::NotReadable);
    let err = file.write_from(&mut source).unwrap_err();
    assert_eq!(err.errno, errno::EFAULT);
    assert_eq!(file.seek(0, Whence::SEEK_CUR).unwrap(), 0);

    assert_eq!(file.read(8).unwrap(), b"pristine");
}

/// Test: a fault mid-stream only fails the faulting call
#[test]
fn test_fault_after_successful_reads() {
    let (manager, module, log) = test_bootstrap(32);
    let mut file = manager.open(module.dev()).unwrap();

    let mut sink = FaultyUserBuffer::new(UserBuffer::with_window(32), FaultPolicy::AfterCopies(2));
    assert_eq!(file.read_into(&mut sink, 4).unwrap(), 4);
    assert_eq!(file.read_into(&mut sink, 4).unwrap(), 4);
    assert_eq!(file.read_into(&mut sink, 4).unwrap_err().errno, errno::EFAULT);
    assert_eq!(file.seek(0, Whence::SEEK_CUR).unwrap(), 8);

    let warnings = log.filter_level(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "read failed");
    assert_eq!(warnings[0].field("position"), Some("8"));
}

/// Test: registration refused at init leaves nothing behind
#[test]
fn test_init_refused_leaves_no_region() {
    let mut manager = DeviceManager::new(Box::new(DenyAllDevices));
    let log = KernelLog::new();
    let result = ScullModule::init(&mut manager, ScullConfig::default(), log.clone());

    assert!(matches!(result, Err(ModuleError::Registration(_))));
    assert!(manager.regions().is_empty());
    assert!(log.entries().iter().any(|e| e.message == "Can't add device"));
}

/// Test: the module can be loaded again after a clean unload
#[test]
fn test_reload_after_exit() {
    let (mut manager, module, _log) = test_bootstrap(16);
    let mut file = manager.open(module.dev()).unwrap();
    file.write(b"gone").unwrap();
    file.close();
    module.exit(&mut manager).unwrap();

    let module = ScullModule::init(&mut manager, ScullConfig::default(), KernelLog::new()).unwrap();
    let mut file = manager.open(module.dev()).unwrap();
    // A fresh store is zero-filled again
    assert_eq!(file.read(4).unwrap(), vec![0u8; 4]);
    file.close();
    module.exit(&mut manager).unwrap();
}

/// Test: unloading with files open is reported, and the files stay usable
#[test]
fn test_exit_with_open_files() {
    let (mut manager, module, _log) = test_bootstrap(16);
    let mut first = manager.open(module.dev()).unwrap();
    let _second = manager.open(module.dev()).unwrap();

    let result = module.exit(&mut manager);
    assert!(matches!(
        result,
        Err(ModuleError::Store(ScullError::StoreBusy { open_sessions: 2 }))
    ));

    assert_eq!(first.write(b"still here").unwrap(), 10);
    first.seek(0, Whence::SEEK_SET).unwrap();
    assert_eq!(first.read(10).unwrap(), b"still here");
}
