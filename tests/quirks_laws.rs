use std::fs;

use moused::{
    device::{Bus, DeviceIdentity, UdevType},
    event_model::codes,
    quirks::{Quirk, QuirksStore, loader},
};

fn device(vendor: u16, product: u16) -> DeviceIdentity {
    DeviceIdentity {
        bus: Bus::Usb,
        vendor,
        product,
        version: 0x0110,
        name: "Contoso Wireless Mouse".into(),
        uniq: "00:11:22".into(),
        udev_type: UdevType::MOUSE,
        dmi: Some("dmi:svnContoso:pnLaptop9".into()),
        dt: None,
    }
}

fn load(files: &[(&str, &str)]) -> QuirksStore {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        fs::write(dir.path().join(name), text).unwrap();
    }
    // 非 .quirks 文件不加载
    fs::write(dir.path().join("README"), "not toml at all [[").unwrap();
    loader::load_dir(dir.path()).unwrap()
}

#[test]
fn later_file_overrides_scalar() {
    let store = load(&[
        (
            "50-vendor.quirks",
            r#"
            [[section]]
            name = "contoso"
            match = { vendor = 0x1234 }
            properties = { MousedClickThreshold = 300, MousedEmulateThirdButton = true }
            "#,
        ),
        (
            "10-generic.quirks",
            r#"
            [[section]]
            name = "all usb mice"
            match = { bus = "usb", udev_type = ["mouse"] }
            properties = { MousedClickThreshold = 500 }
            "#,
        ),
    ]);
    assert_eq!(store.len(), 2);
    let quirks = store.fetch(&device(0x1234, 0x0002)).unwrap();
    // 10- 先加载, 50- 后加载并覆盖
    assert_eq!(quirks.get_uint(Quirk::MousedClickThreshold), Some(300));
    assert_eq!(quirks.get_bool(Quirk::MousedEmulateThirdButton), Some(true));

    let other = store.fetch(&device(0x9999, 0x0002)).unwrap();
    assert_eq!(other.get_uint(Quirk::MousedClickThreshold), Some(500));
    assert_eq!(other.get_bool(Quirk::MousedEmulateThirdButton), None);
}

#[test]
fn event_code_lists_merge_per_tuple() {
    let store = load(&[(
        "30-codes.quirks",
        r#"
        [[section]]
        name = "disable side buttons"
        match = { bus = "usb" }
        properties = { AttrEventCode = "-BTN_SIDE;-BTN_EXTRA;-REL_HWHEEL" }

        [[section]]
        name = "this model has a working extra button"
        match = { vendor = 0x1234, dmi = "dmi:*pnLaptop9*" }
        properties = { AttrEventCode = "+BTN_EXTRA" }
        "#,
    )]);
    let quirks = store.fetch(&device(0x1234, 1)).unwrap();
    let codes_list = quirks.get_tuples(Quirk::AttrEventCode).unwrap();
    assert_eq!(codes_list.len(), 3);
    assert_eq!(codes_list.get(codes::EV_KEY, codes::BTN_SIDE), Some(false));
    assert_eq!(codes_list.get(codes::EV_KEY, codes::BTN_EXTRA), Some(true));
    assert_eq!(codes_list.get(codes::EV_REL, codes::REL_HWHEEL), Some(false));
}

#[test]
fn any_kernel_event_name_is_accepted() {
    let store = load(&[(
        "60-multitouch.quirks",
        r#"
        [[section]]
        name = "drop slots and stray keys"
        match = { vendor = 0x1234 }
        properties = { AttrEventCode = "-ABS_MT_SLOT;-BTN_0;-KEY_A" }
        "#,
    )]);
    assert_eq!(store.len(), 1);
    let quirks = store.fetch(&device(0x1234, 1)).unwrap();
    let list = quirks.get_tuples(Quirk::AttrEventCode).unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list.get(codes::EV_ABS, 0x2f), Some(false));
    assert_eq!(list.get(codes::EV_KEY, 0x100), Some(false));
    assert_eq!(list.get(codes::EV_KEY, 30), Some(false));
}

#[test]
fn product_list_is_any_of() {
    let store = load(&[(
        "40-products.quirks",
        r#"
        [[section]]
        name = "two products"
        match = { vendor = 0x1234, product = [0x0001, 0x0002] }
        properties = { MousedIgnoreDevice = true }
        "#,
    )]);
    assert!(store.fetch(&device(0x1234, 0x0002)).is_some());
    assert!(store.fetch(&device(0x1234, 0x0001)).is_some());
    assert!(store.fetch(&device(0x1234, 0x0003)).is_none());
    assert!(store.fetch(&device(0x4321, 0x0002)).is_none());
}

#[test]
fn broken_file_does_not_stop_loading() {
    let store = load(&[
        ("10-broken.quirks", "[[section]\nname = \"oops\"\n"),
        (
            "20-ok.quirks",
            r#"
            [[section]]
            name = "ok"
            match = { name = "Contoso*" }
            properties = { MousedWheelButtons = 4 }
            "#,
        ),
    ]);
    assert_eq!(store.len(), 1);
    let quirks = store.fetch(&device(1, 1)).unwrap();
    assert_eq!(quirks.get_uint(Quirk::MousedWheelButtons), Some(4));
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(loader::load_dir(&dir.path().join("nope")).is_err());
}
