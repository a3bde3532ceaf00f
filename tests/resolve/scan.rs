use std::cell::RefCell;

use peimport::{ImageBoundsProbe, LoadedModule, MemoryProbe, Resolver, ResolverConfig};

use crate::common::{ImageBuilder, EXPORT_RVA};

/// Probe that defers to the image bounds and records every address it is asked about.
struct RecordingProbe {
    inner: ImageBoundsProbe,
    seen: RefCell<Vec<usize>>,
}

impl RecordingProbe {
    fn new(module: LoadedModule, size: usize) -> Self {
        Self {
            inner: unsafe { ImageBoundsProbe::new(module, size as u32, 512) },
            seen: RefCell::new(Vec::new()),
        }
    }
}

unsafe impl MemoryProbe for RecordingProbe {
    fn is_readable(&self, address: usize) -> bool {
        self.seen.borrow_mut().push(address);
        self.inner.is_readable(address)
    }

    fn is_alphanumeric(&self, address: usize) -> bool {
        self.inner.is_alphanumeric(address)
    }
}

/// Accepts every address inside the image without looking for a terminator.
struct InImageOnly {
    start: usize,
    end: usize,
    names: ImageBoundsProbe,
}

impl InImageOnly {
    fn new(module: LoadedModule, size: usize) -> Self {
        Self {
            start: module.base(),
            end: module.base() + size,
            names: unsafe { ImageBoundsProbe::new(module, size as u32, size) },
        }
    }
}

unsafe impl MemoryProbe for InImageOnly {
    fn is_readable(&self, address: usize) -> bool {
        (self.start..self.end).contains(&address)
    }

    fn is_alphanumeric(&self, address: usize) -> bool {
        self.names.is_alphanumeric(address)
    }
}

#[test]
fn test_alphanumeric_filter() {
    let image = ImageBuilder::new()
        .export("Foo1", 0x1000)
        .export("Bar_2", 0x1010)
        .export("Baz3", 0x1020)
        .build();
    let resolver = Resolver::new("filter.dll", &image.registry("filter.dll")).unwrap();

    let mut names = resolver.names();
    names.sort_unstable();
    assert_eq!(names, vec!["Baz3", "Foo1"]);
    assert!(!resolver.contains("Bar_2"));
    assert_eq!(resolver.address_of("Foo1"), Some(image.base() + 0x1000));
    assert_eq!(resolver.address_of("Baz3"), Some(image.base() + 0x1020));
}

#[test]
fn test_unreadable_name_stops_scan() {
    let image = ImageBuilder::new()
        .export("Zero", 0x1000)
        .export("One", 0x1010)
        .unreadable_export(0x1020)
        .export("Three", 0x1030)
        .export("Four", 0x1040)
        .build();
    let registry = image.registry("stop.dll");
    let probe = RecordingProbe::new(image.module(), image.len());

    let resolver =
        Resolver::with_probe("stop.dll", &registry, &probe, ResolverConfig::default()).unwrap();

    let mut names = resolver.names();
    names.sort_unstable();
    assert_eq!(names, vec!["One", "Zero"]);

    // Index 2 was the last name pointer looked at; 3 and 4 were never probed
    let seen = probe.seen.borrow();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], image.base() + crate::common::UNREADABLE_RVA as usize);
}

#[test]
fn test_result_bounded_by_declared_function_count() {
    let image = ImageBuilder::new()
        .export("Alpha", 0x1000)
        .export("Beta", 0x1010)
        .export("Gamma", 0x1020)
        .export("Delta", 0x1030)
        .number_of_functions(2)
        .build();
    let resolver = Resolver::new("count.dll", &image.registry("count.dll")).unwrap();

    assert!(resolver.len() <= 2);
    assert!(resolver.contains("Alpha"));
    assert!(resolver.contains("Beta"));
    assert!(!resolver.contains("Gamma"));
}

#[test]
fn test_max_exports_limits_scan() {
    let image = ImageBuilder::new()
        .export("Alpha", 0x1000)
        .export("Beta", 0x1010)
        .export("Gamma", 0x1020)
        .build();
    let config = ResolverConfig::default().with_max_exports(1);
    let resolver = Resolver::with_config("cap.dll", &image.registry("cap.dll"), config).unwrap();

    assert_eq!(resolver.names(), vec!["Alpha"]);
}

#[test]
fn test_name_length_limit() {
    let image = ImageBuilder::new()
        .export("Short", 0x1000)
        .export("AnExtremelyLongExportNameThatKeepsGoing", 0x1010)
        .build();
    let config = ResolverConfig::default().with_max_name_len(16);
    let resolver = Resolver::with_config("len.dll", &image.registry("len.dll"), config).unwrap();

    // The long name has no terminator within the limit, so it reads as
    // unreadable and ends the scan after it.
    assert_eq!(resolver.names(), vec!["Short"]);
}

#[test]
fn test_overlong_name_stops_scan_with_lenient_reader() {
    let image = ImageBuilder::new()
        .export("Short", 0x1000)
        .export("AnExtremelyLongExportNameThatKeepsGoing", 0x1010)
        .export("After", 0x1020)
        .build();
    let registry = image.registry("lenient.dll");
    let reader = InImageOnly::new(image.module(), image.len());
    let config = ResolverConfig::default().with_max_name_len(16);

    // The reader accepts the long name; the length limit still ends the scan
    let resolver = Resolver::with_probe("lenient.dll", &registry, &reader, config).unwrap();
    assert_eq!(resolver.names(), vec!["Short"]);
    assert!(!resolver.contains("After"));
}

#[test]
fn test_ordinals_select_function_slots() {
    // Names listed in a different order than the function array
    let image = ImageBuilder::new()
        .function(0x3000)
        .function(0x1000)
        .function(0x2000)
        .named("First", 1)
        .named("Second", 2)
        .named("Third", 0)
        .build();
    let resolver = Resolver::new("ord.dll", &image.registry("ord.dll")).unwrap();

    assert_eq!(resolver.address_of("First"), Some(image.base() + 0x1000));
    assert_eq!(resolver.address_of("Second"), Some(image.base() + 0x2000));
    assert_eq!(resolver.address_of("Third"), Some(image.base() + 0x3000));

    let third = resolver.entry("Third").unwrap();
    assert_eq!(third.ordinal, 1); // ordinal base 1, slot 0
    assert_eq!(third.rva, 0x3000);
}

#[test]
fn test_out_of_range_ordinal_skipped() {
    let image = ImageBuilder::new()
        .export("Good", 0x1000)
        .named("Stray", 7)
        .function(0x1010)
        .build();
    let resolver = Resolver::new("stray.dll", &image.registry("stray.dll")).unwrap();

    assert!(resolver.contains("Good"));
    assert!(!resolver.contains("Stray"));
}

#[test]
fn test_duplicate_name_last_wins() {
    let image = ImageBuilder::new()
        .export("Twice", 0x1000)
        .export("Twice", 0x2000)
        .build();
    let resolver = Resolver::new("dup.dll", &image.registry("dup.dll")).unwrap();

    assert_eq!(resolver.len(), 1);
    assert_eq!(resolver.address_of("Twice"), Some(image.base() + 0x2000));
}

#[test]
fn test_forwarded_export_flagged() {
    let image = ImageBuilder::new()
        .export("Local", 0x1000)
        .export("Forwarded", EXPORT_RVA + 8)
        .build();
    let resolver = Resolver::new("fwd.dll", &image.registry("fwd.dll")).unwrap();

    assert!(!resolver.entry("Local").unwrap().forwarded);
    assert!(resolver.entry("Forwarded").unwrap().forwarded);
}

#[test]
fn test_declared_module_name() {
    let image = ImageBuilder::new()
        .export("Foo1", 0x1000)
        .dll_name("Declared.dll")
        .build();
    let resolver = Resolver::new("alias.dll", &image.registry("alias.dll")).unwrap();
    assert_eq!(resolver.module_name(), "alias.dll");
    assert_eq!(resolver.declared_name(), Some("Declared.dll"));

    let anonymous = ImageBuilder::new().export("Foo1", 0x1000).build();
    let resolver = Resolver::new("anon.dll", &anonymous.registry("anon.dll")).unwrap();
    assert_eq!(resolver.declared_name(), None);
}
