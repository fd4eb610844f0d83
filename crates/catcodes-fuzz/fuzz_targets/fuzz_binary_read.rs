#![no_main]

use libfuzzer_sys::fuzz_target;

use catcodes::CategoryContainer;

fuzz_target!(|data: &[u8]| {
    if let Ok(container) = CategoryContainer::from_bytes(data) {
        // Anything that loads must survive a round trip unchanged.
        let bytes = container.to_bytes().expect("loaded container re-encodes");
        let again = CategoryContainer::from_bytes(&bytes).expect("re-encoded block loads");
        assert_eq!(again, container);
    }
    let mut reader = data;
    let _ = CategoryContainer::read_from(&mut reader);
});
