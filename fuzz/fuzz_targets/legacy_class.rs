#![no_main]

use libfuzzer_sys::fuzz_target;
use objcabi::prelude::*;

const BASE: Address = Address::new(0x10000);

fuzz_target!(|data: &[u8]| {
    let Ok(image) = Image::from_mem(data.to_vec(), BASE, Target::LP64_LE) else {
        return;
    };
    let runtime = Runtime::with_protocol_class(BASE);
    let upgrader = Upgrader::with_config(&image, &runtime, UpgradeConfig::lenient());

    if let Ok(class) = upgrader.upgrade_class(BASE) {
        let mut emitter = Emitter::new(Address::new(0x0800_0000), image.target());
        let _ = emitter.emit_class(&class);
    }
    let _ = upgrader.upgrade_protocol_gsv1(BASE);
    let _ = upgrader.upgrade_category(BASE);
});
