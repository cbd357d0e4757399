use std::{sync::Arc, time::Instant};

use crab_usb4604::{
    controller::{SETTLE_MAX, SETTLE_MIN},
    driver::{DRIVER_NAME, OF_COMPATIBLE},
    *,
};
use hub_test_helper::{GpioEvent, MockGpio, RecordingKernel, StdKernel, init_log};

#[test]
fn test_attach_platform_data_hub() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(StdKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Hub, Some(PinId::new(5))));

    let start = Instant::now();
    let hub = Usb4604Driver.attach(&ctx).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(hub.mode(), Mode::Hub);
    assert_eq!(gpio.level(PinId::new(5)), Some(Level::High));
    assert!(elapsed >= SETTLE_MIN, "attach took {elapsed:?}");
    assert!(kernel.slept() >= SETTLE_MIN);
}

#[test]
fn test_standby_returns_without_settle() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(StdKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::from_raw(2, 12));

    let hub = Usb4604Driver.attach(&ctx).unwrap();
    assert_eq!(hub.mode(), Mode::Standby);
    assert_eq!(gpio.level(PinId::new(12)), Some(Level::Low));
    assert_eq!(kernel.slept(), std::time::Duration::ZERO);

    hub.switch_mode(Mode::Hub).unwrap();
    assert!(kernel.slept() >= SETTLE_MIN);
    assert_eq!(gpio.level(PinId::new(12)), Some(Level::High));

    let before = kernel.slept();
    hub.switch_mode(Mode::Standby).unwrap();
    assert_eq!(kernel.slept(), before);
    assert_eq!(gpio.level(PinId::new(12)), Some(Level::Low));
}

#[test]
fn test_attach_deferred_then_retry() {
    init_log();

    let chips = GpioChipRegistry::new();
    let node = PropertyNode::new("usb-hub", &chips)
        .with_compatible(OF_COMPATIBLE)
        .with_gpios("reset-gpios", &[GpioSpec::new(0x2a, 6)]);
    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone()).with_of_node(&node);

    let err = Usb4604Driver.attach(&ctx).unwrap_err();
    assert!(matches!(err, Error::Deferred));
    assert!(err.is_retryable());
    assert!(gpio.events().is_empty());
    assert!(kernel.sleeps().is_empty());

    // GPIO 控制器注册后重新 attach
    chips.register(0x2a, 64, 32);
    let hub = Usb4604Driver.attach(&ctx).unwrap();
    assert_eq!(hub.mode(), Mode::Hub);
    assert_eq!(hub.config().reset_line(), Some(PinId::new(70)));
    assert_eq!(gpio.level(PinId::new(70)), Some(Level::High));
    assert_eq!(kernel.sleeps(), [(SETTLE_MIN, SETTLE_MAX)]);
}

#[test]
fn test_attach_without_configuration() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone());

    let hub = Usb4604Driver.attach(&ctx).unwrap();
    assert_eq!(hub.mode(), Mode::Hub);
    assert_eq!(*hub.config(), ControllerConfig::new(Mode::Hub, None));
    assert!(gpio.events().is_empty());
    assert_eq!(kernel.sleeps().len(), 1);

    hub.detach();
    assert!(gpio.events().is_empty());
}

#[test]
fn test_attach_node_initial_standby() {
    init_log();

    let chips = GpioChipRegistry::new();
    chips.register(1, 0, 32);
    let node = PropertyNode::new("usb-hub", &chips)
        .with_compatible(OF_COMPATIBLE)
        .with_gpios("reset-gpios", &[GpioSpec::new(1, 21)])
        .with_u32("initial-mode", 2);
    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone()).with_of_node(&node);

    assert!(Usb4604Driver.matches(&node));
    let hub = Usb4604Driver.attach(&ctx).unwrap();
    assert_eq!(hub.mode(), Mode::Standby);
    assert_eq!(gpio.level(PinId::new(21)), Some(Level::Low));
    assert!(kernel.sleeps().is_empty());
}

#[test]
fn test_attach_invalid_initial_mode() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Unknown, Some(PinId::new(5))));

    let err = Usb4604Driver.attach(&ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidMode(Mode::Unknown)));
    assert!(!err.is_retryable());
    // 失败的 attach 不能占用复位线
    assert!(!gpio.is_requested(PinId::new(5)));
    assert!(kernel.sleeps().is_empty());
}

#[test]
fn test_attach_claim_failure() {
    init_log();

    let gpio = MockGpio::new();
    gpio.fail_request(PinId::new(5), GpioError::Busy);
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Hub, Some(PinId::new(5))));

    let err = Usb4604Driver.attach(&ctx).unwrap_err();
    assert!(matches!(
        err,
        Error::ResourceClaimFailed {
            source: GpioError::Busy,
            ..
        }
    ));
    assert!(gpio.events().is_empty());
    assert!(kernel.sleeps().is_empty());
}

#[test]
fn test_reset_line_is_exclusive() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Hub, Some(PinId::new(5))));

    let first = Usb4604Driver.attach(&ctx).unwrap();
    let err = Usb4604Driver.attach(&ctx).unwrap_err();
    assert!(matches!(err, Error::ResourceClaimFailed { .. }));

    first.detach();
    let second = Usb4604Driver.attach(&ctx).unwrap();
    assert_eq!(second.mode(), Mode::Hub);
}

#[test]
fn test_detach_releases_reset_line() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Hub, Some(PinId::new(8))));

    let hub = Usb4604Driver.attach(&ctx).unwrap();
    hub.switch_mode(Mode::Standby).unwrap();
    hub.detach();

    let pin = PinId::new(8);
    assert!(!gpio.is_requested(pin));
    assert_eq!(
        gpio.events(),
        [
            GpioEvent::Request {
                pin,
                flags: GpioFlags::OUT_INIT_LOW
            },
            GpioEvent::Set {
                pin,
                level: Level::High
            },
            GpioEvent::Set {
                pin,
                level: Level::Low
            },
            GpioEvent::Free { pin },
        ]
    );
}

#[test]
fn test_runtime_switch_serialized() {
    init_log();

    let gpio = MockGpio::new();
    let kernel = Arc::new(RecordingKernel::new());
    let ctx = AttachContext::new(&gpio, kernel.clone())
        .with_platform_data(PlatformData::new(Mode::Standby, Some(PinId::new(3))));
    let hub = Arc::new(Usb4604Driver.attach(&ctx).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let hub = hub.clone();
            std::thread::spawn(move || {
                let mode = if i % 2 == 0 { Mode::Hub } else { Mode::Standby };
                for _ in 0..10 {
                    hub.switch_mode(mode).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    // 每次切换都在锁内完成，电平与记录的模式一致
    let level = gpio.level(PinId::new(3)).unwrap();
    match hub.mode() {
        Mode::Hub => assert_eq!(level, Level::High),
        Mode::Standby => assert_eq!(level, Level::Low),
        Mode::Unknown => panic!("mode left unknown"),
    }
    assert_eq!(kernel.sleeps().len(), 20);
}

#[test]
fn test_driver_identity() {
    let driver = Usb4604Driver;
    assert_eq!(driver.name(), DRIVER_NAME);
    assert_eq!(driver.compatible(), ["smsc,usb4604"]);

    let chips = GpioChipRegistry::new();
    let other = PropertyNode::new("usb-hub", &chips).with_compatible("smsc,usb3503");
    assert!(!driver.matches(&other));
}
