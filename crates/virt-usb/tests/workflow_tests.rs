//! Integration tests for the selection and attachment workflow
//!
//! Exercises the library end to end against in-memory collaborators:
//! - domain and device selection against live listings
//! - attach/detach/reattach batches and their summaries
//! - hotplug events with and without the ignore list

use common::Error;
use hostdev::{Operation, UsbId};
use proptest::prelude::*;
use virt_usb::hotplug::{HotplugAction, handle_event, resolve_target_domain};
use virt_usb::inventory::parse_listing;
use virt_usb::test_utils::{
    FakeHypervisor, HypervisorCall, SAMPLE_LSUSB, ScriptedPrompter, StaticLister, device,
};
use virt_usb::{
    AttachmentRequest, DeviceLister, HotplugEvent, HotplugOutcome, IgnoreList, apply,
    resolve_domain, resolve_usb_ids,
};

const FOO: UsbId = UsbId::new(0x1234, 0x5678);
const BAR: UsbId = UsbId::new(0xaaaa, 0xbbbb);
const ROOT_HUB: UsbId = UsbId::new(0x1d6b, 0x0002);

mod selection {
    use super::*;

    #[test]
    fn test_unknown_domain_is_named_in_error() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", true)
            .with_domain("vm2", true);
        let mut prompter = ScriptedPrompter::default();

        let err = resolve_domain(&hv, Some("vm3"), &mut prompter).unwrap_err();
        assert!(matches!(err, Error::UnknownDomain(_)));
        assert!(err.to_string().contains("vm3"));
    }

    #[test]
    fn test_defined_but_stopped_domain_is_selectable() {
        let hv = FakeHypervisor::new().with_domain("vm1", false);
        let mut prompter = ScriptedPrompter::default();
        assert_eq!(resolve_domain(&hv, Some("vm1"), &mut prompter).unwrap(), "vm1");
    }

    #[test]
    fn test_unknown_ids_reported_not_fatal() {
        let devices = vec![device("1234:5678", "Foo"), device("aaaa:bbbb", "Bar")];
        let mut prompter = ScriptedPrompter::default();

        let ids = resolve_usb_ids(&devices, Some("1234:5678,ffff:ffff"), &mut prompter).unwrap();

        assert_eq!(ids, vec![FOO]);
        assert_eq!(prompter.reports, vec!["Invalid USB device: ffff:ffff"]);
    }

    #[test]
    fn test_selection_from_parsed_listing() {
        let devices = StaticLister::new(parse_listing(SAMPLE_LSUSB))
            .list_devices()
            .unwrap();
        let mut prompter = ScriptedPrompter::new(["1,2"]);

        let ids = resolve_usb_ids(&devices, None, &mut prompter).unwrap();

        assert_eq!(ids, vec![FOO, BAR]);
        assert_eq!(prompter.questions, vec!["Pick the desired USB devices: "]);
        assert_eq!(prompter.shown[0][1], "Foo (1234:5678)");
    }

    #[test]
    fn test_empty_enumeration_has_no_valid_devices() {
        let mut prompter = ScriptedPrompter::default();
        let result = resolve_usb_ids(&[], Some("1234:5678"), &mut prompter);
        assert!(matches!(result, Err(Error::NoValidDevices)));
    }

    #[test]
    fn test_lister_failure_is_enumeration_error() {
        let err = StaticLister::failing("lsusb: not found")
            .list_devices()
            .unwrap_err();
        assert!(matches!(err, Error::Enumeration(_)));
    }
}

mod execution {
    use super::*;

    #[test]
    fn test_select_then_attach() {
        let hv = FakeHypervisor::new().with_domain("vm1", true);
        let devices = parse_listing(SAMPLE_LSUSB);
        let mut prompter = ScriptedPrompter::new(["0"]);

        let domain = resolve_domain(&hv, None, &mut prompter).unwrap();
        let ids = resolve_usb_ids(&devices, Some("1234:5678"), &mut prompter).unwrap();
        let report = apply(
            &hv,
            &AttachmentRequest {
                domain,
                devices: ids,
                operation: Operation::Attach,
            },
        )
        .unwrap();

        assert_eq!(
            hv.calls(),
            vec![HypervisorCall::Attach {
                domain: "vm1".into(),
                id: FOO
            }]
        );
        assert_eq!(report.summary(), vec!["Attached devices: 1234:5678"]);
    }

    #[test]
    fn test_reattach_records_attach_failure() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", true)
            .fail_attach(FOO, "USB device 1234:5678 is in use");

        let report = apply(
            &hv,
            &AttachmentRequest {
                domain: "vm1".to_string(),
                devices: vec![FOO],
                operation: Operation::Reattach,
            },
        )
        .unwrap();

        assert_eq!(
            hv.calls(),
            vec![
                HypervisorCall::Detach {
                    domain: "vm1".into(),
                    id: FOO
                },
                HypervisorCall::Attach {
                    domain: "vm1".into(),
                    id: FOO
                },
            ]
        );
        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed_ids(), vec![FOO]);
        assert_eq!(
            report.summary(),
            vec!["Failed to reattach these devices: 1234:5678"]
        );
    }

    #[test]
    fn test_stopped_domain_aborts_without_report() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", false)
            .refuse_changes("vm1");

        let result = apply(
            &hv,
            &AttachmentRequest {
                domain: "vm1".to_string(),
                devices: vec![FOO, BAR],
                operation: Operation::Detach,
            },
        );

        assert!(matches!(result, Err(Error::DomainNotRunning(_))));
        assert_eq!(hv.calls().len(), 1);
    }

    #[test]
    fn test_missing_device_on_stopped_domain_fails_only_that_device() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", false)
            .fail_detach(FOO, "matching host device not found");

        let report = apply(
            &hv,
            &AttachmentRequest {
                domain: "vm1".to_string(),
                devices: vec![FOO, BAR],
                operation: Operation::Detach,
            },
        )
        .unwrap();

        assert_eq!(report.failed_ids(), vec![FOO]);
        assert_eq!(report.succeeded, vec![BAR]);
        assert_eq!(
            report.summary(),
            vec![
                "Detached devices: aaaa:bbbb",
                "Failed to detach these devices: 1234:5678"
            ]
        );
    }
}

mod hotplug {
    use super::*;

    fn add_event(id: UsbId) -> HotplugEvent {
        HotplugEvent {
            id,
            action: HotplugAction::Add,
        }
    }

    #[test]
    fn test_ignored_device_makes_no_call() {
        let hv = FakeHypervisor::new().with_domain("vm1", true);
        let ignore = IgnoreList::parse("1d6b:0002\n");

        let outcome = handle_event(&hv, &add_event(ROOT_HUB), None, &ignore).unwrap();

        assert_eq!(outcome, HotplugOutcome::Ignored(ROOT_HUB));
        assert!(hv.calls().is_empty());
    }

    #[test]
    fn test_ignore_list_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usb-ignorelist.conf");
        std::fs::write(&path, "# keep hubs on the host\n1d6b:0002\n").unwrap();

        let hv = FakeHypervisor::new().with_domain("vm1", true);
        let ignore = IgnoreList::load(&path).unwrap();
        let event = HotplugEvent::from_vars(Some("1d6b/2/606"), Some("add")).unwrap();

        let outcome = handle_event(&hv, &event, None, &ignore).unwrap();
        assert_eq!(outcome, HotplugOutcome::Ignored(ROOT_HUB));
        assert!(hv.calls().is_empty());
    }

    #[test]
    fn test_add_attaches_to_first_running_domain() {
        let hv = FakeHypervisor::new()
            .with_domain("stopped", false)
            .with_domain("vm1", true)
            .with_domain("vm2", true);

        let outcome = handle_event(&hv, &add_event(FOO), None, &IgnoreList::default()).unwrap();

        assert_eq!(
            outcome,
            HotplugOutcome::Attached {
                domain: "vm1".to_string(),
                id: FOO
            }
        );
        assert_eq!(
            hv.calls(),
            vec![HypervisorCall::Attach {
                domain: "vm1".into(),
                id: FOO
            }]
        );
    }

    #[test]
    fn test_remove_detaches_from_requested_domain() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", true)
            .with_domain("vm2", true);
        let event = HotplugEvent::from_vars(Some("aaaa/bbbb/100"), Some("remove")).unwrap();

        let outcome = handle_event(&hv, &event, Some("vm2"), &IgnoreList::default()).unwrap();

        assert_eq!(
            outcome,
            HotplugOutcome::Detached {
                domain: "vm2".to_string(),
                id: BAR
            }
        );
    }

    #[test]
    fn test_other_actions_are_skipped() {
        let hv = FakeHypervisor::new().with_domain("vm1", true);
        let event = HotplugEvent::from_vars(Some("1234/5678"), Some("bind")).unwrap();

        let outcome = handle_event(&hv, &event, None, &IgnoreList::default()).unwrap();

        assert_eq!(outcome, HotplugOutcome::Skipped("bind".to_string()));
        assert!(hv.calls().is_empty());
    }

    #[test]
    fn test_no_running_domain() {
        let hv = FakeHypervisor::new().with_domain("vm1", false);
        assert!(matches!(
            resolve_target_domain(&hv, None),
            Err(Error::NoActiveDomain)
        ));
    }

    #[test]
    fn test_requested_domain_must_exist() {
        let hv = FakeHypervisor::new().with_domain("vm1", true);
        let result = handle_event(&hv, &add_event(FOO), Some("vm9"), &IgnoreList::default());
        assert!(matches!(result, Err(Error::UnknownDomain(_))));
        assert!(hv.calls().is_empty());
    }

    #[test]
    fn test_attach_failure_is_returned() {
        let hv = FakeHypervisor::new()
            .with_domain("vm1", true)
            .fail_attach(FOO, "no free USB port");
        let result = handle_event(&hv, &add_event(FOO), None, &IgnoreList::default());
        assert!(matches!(result, Err(Error::Hypervisor(_))));
    }
}

fn arb_id() -> impl Strategy<Value = UsbId> {
    (0u16..8, 0u16..8).prop_map(|(v, p)| UsbId::new(v, p))
}

proptest! {
    #[test]
    fn prop_accepted_ids_are_enumerated(
        present in proptest::collection::vec(arb_id(), 0..6),
        requested in proptest::collection::vec(arb_id(), 1..8),
    ) {
        let devices: Vec<_> = present
            .iter()
            .map(|id| device(&id.to_string(), "Dev"))
            .collect();
        let csv = requested
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut prompter = ScriptedPrompter::default();

        match resolve_usb_ids(&devices, Some(&csv), &mut prompter) {
            Ok(ids) => {
                for id in &ids {
                    prop_assert!(present.contains(id));
                }
                for id in &requested {
                    prop_assert_eq!(present.contains(id), ids.contains(id));
                }
            }
            Err(Error::NoValidDevices) => {
                prop_assert!(requested.iter().all(|id| !present.contains(id)));
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }

        let rejected = requested.iter().filter(|id| !present.contains(id)).count();
        prop_assert_eq!(prompter.reports.len(), rejected);
    }
}
