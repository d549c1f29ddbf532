use hc05_core::demo::{DemoModule, DEMO_PORT};
use hc05_core::module_config::{ModuleConfig, Role, UartSettings};
use hc05_core::protocol::{ProberConfig, SessionTiming};
use hc05_core::wizard::{
    ModuleOutcome, OutcomeKind, ScriptedConsole, Wizard, WizardError, WizardOptions,
};
use pretty_assertions::assert_eq;

fn options(fixed_port: Option<&str>) -> WizardOptions {
    WizardOptions {
        prober: ProberConfig {
            timing: SessionTiming::immediate(),
            ..ProberConfig::default()
        },
        fixed_port: fixed_port.map(str::to_string),
    }
}

fn run(
    module: &DemoModule,
    fixed_port: Option<&str>,
    answers: &[&str],
) -> (Vec<ModuleOutcome>, ScriptedConsole) {
    let mut wizard = Wizard::new(module.clone(), options(fixed_port));
    let mut console = ScriptedConsole::new(answers.iter().copied());
    wizard.run(&mut console).expect("run completes");
    assert_eq!(console.remaining(), 0, "unused answers");
    (wizard.outcomes().to_vec(), console)
}

#[test]
fn test_configure_two_modules_reusing_config() {
    let module = DemoModule::new(38400);
    let answers = [
        // first module
        "1", "", "Beacon", "", "1", "", "", "",
        // second module
        "1", "y", "", "", "n",
    ];
    let (outcomes, console) = run(&module, None, &answers);

    let expected = ModuleConfig::new(
        "Beacon",
        "1234",
        Role::Master,
        UartSettings::default(),
    )
    .unwrap();
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(outcome.port, DEMO_PORT);
        assert_eq!(outcome.baud, Some(38400));
        assert_eq!(
            outcome.kind,
            OutcomeKind::Configured {
                config: expected.clone(),
                verification: Some("+NAME:Beacon".to_string()),
            }
        );
    }

    let applies: Vec<String> = module
        .written()
        .into_iter()
        .filter(|line| line.contains('='))
        .collect();
    assert_eq!(applies.len(), 8);
    assert_eq!(applies[..4], applies[4..]);
    assert_eq!(
        applies[..4],
        [
            "AT+NAME=Beacon\r\n",
            "AT+PSWD=1234\r\n",
            "AT+ROLE=1\r\n",
            "AT+UART=9600,0,0\r\n",
        ]
    );
    assert!(console
        .output()
        .contains(&"Reusing previous configuration settings.".to_string()));
    assert!(console
        .output()
        .contains(&"Verification (Name): +NAME:Beacon".to_string()));
}

#[test]
fn test_query_shows_current_settings() {
    let module = DemoModule::new(9600);
    let (_, console) = run(&module, None, &["1", "n", "n"]);

    let output = console.output();
    assert!(output.contains(&"1: /dev/ttyDEMO0 - Simulated HC-05 (demo)".to_string()));
    assert!(output.contains(&"Module connected and in AT mode.".to_string()));
    assert!(output.contains(&"Current module name: +NAME:HC-05".to_string()));
    assert!(output.contains(&"Current role: +ROLE:0".to_string()));
    assert!(output.contains(&"Current UART settings: +UART:9600,0,0".to_string()));
    assert!(output.contains(&"Leaving module unchanged.".to_string()));
}

#[test]
fn test_leave_unchanged() {
    let module = DemoModule::new(57600);
    let (outcomes, _) = run(&module, None, &["1", "n", "n"]);

    assert_eq!(
        outcomes,
        vec![ModuleOutcome {
            port: DEMO_PORT.to_string(),
            baud: Some(57600),
            kind: OutcomeKind::LeftUnchanged,
        }]
    );
    assert!(!module.commands().iter().any(|c| c.contains('=')));
}

#[test]
fn test_rejected_command_then_skip() {
    let module = DemoModule::new(38400).rejecting("AT+PSWD=");
    let answers = ["1", "", "", "", "", "", "", "n", "", "n"];
    let (outcomes, console) = run(&module, None, &answers);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].kind,
        OutcomeKind::Skipped {
            reason: "module rejected AT+PSWD=1234".to_string(),
        }
    );
    assert!(!module.commands().iter().any(|c| c.starts_with("AT+ROLE=")));
    assert!(console
        .output()
        .contains(&"Error applying command: AT+PSWD=1234".to_string()));
    assert!(console
        .prompts()
        .contains(&"Retry configuration for this module? (Y/n): ".to_string()));
    assert_eq!(module.open_handles(), 0);
}

#[test]
fn test_detection_failure_then_skip() {
    let module = DemoModule::new(4800);
    let (outcomes, console) = run(&module, None, &["1", "n", "n", "", "n"]);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].baud, None);
    assert_eq!(
        outcomes[0].kind,
        OutcomeKind::Skipped {
            reason: "AT mode baud rate not detected".to_string(),
        }
    );
    assert_eq!(
        console.prompts()[1..],
        [
            "Manually enter AT mode baud rate? (Y/n): ",
            "Failed auto-detection. Retry? (Y/n): ",
            "Skip module? (Y/n): ",
            "Proceed with next module? (Y/n): ",
        ]
    );
}

#[test]
fn test_connection_error_then_skip() {
    let module = DemoModule::new(9600).busy_after(1);
    let (outcomes, console) = run(&module, None, &["1", "n", "y", "n"]);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].baud, Some(9600));
    match &outcomes[0].kind {
        OutcomeKind::Skipped { reason } => assert!(reason.starts_with("connection error")),
        other => panic!("expected skip, got {:?}", other),
    }
    assert!(console
        .output()
        .iter()
        .any(|line| line.starts_with("Connection error:")));
}

#[test]
fn test_declined_configuration_is_skipped() {
    let module = DemoModule::new(9600);
    let answers = ["1", "", "", "", "", "", "n", "", "n"];
    let (outcomes, _) = run(&module, None, &answers);

    assert_eq!(
        outcomes[0].kind,
        OutcomeKind::Skipped {
            reason: "configuration declined".to_string(),
        }
    );
    assert!(!module.commands().iter().any(|c| c.contains('=')));
}

#[test]
fn test_fixed_port_skips_selection() {
    let module = DemoModule::new(19200);
    let (outcomes, console) = run(&module, Some(DEMO_PORT), &["n", "n"]);

    assert_eq!(outcomes.len(), 1);
    assert!(!console
        .prompts()
        .contains(&"Select port number: ".to_string()));
    assert!(console
        .output()
        .contains(&format!("Using port {}", DEMO_PORT)));
}

#[test]
fn test_retry_and_declined_skip_restart_detection() {
    let module = DemoModule::new(4800);
    let mut wizard = Wizard::new(module.clone(), options(Some(DEMO_PORT)));
    let mut console = ScriptedConsole::new(["n", "y", "n", "n", "n"]);

    let result = wizard.run(&mut console);
    assert!(matches!(result, Err(WizardError::Console(_))));
    assert!(wizard.outcomes().is_empty());
    // three full detection rounds before the script ran out
    assert_eq!(module.opened().len(), 15);
}

#[test]
fn test_last_config_retained_after_failure() {
    let module = DemoModule::new(38400).rejecting("AT+UART=");
    let mut wizard = Wizard::new(module.clone(), options(None));
    let mut console = ScriptedConsole::new([
        "1", "", "Relay", "9999", "0", "115200,0,0", "", "n", "", "n",
    ]);

    wizard.run(&mut console).unwrap();
    let last = wizard.last_config().expect("config kept");
    assert_eq!(last.name, "Relay");
    assert_eq!(last.pswd, "9999");
    assert_eq!(last.uart.to_string(), "115200,0,0");
}

#[test]
fn test_write_failure_mid_apply_recovers() {
    let module = DemoModule::new(38400).failing_write("AT+PSWD=");
    let answers = ["1", "", "", "", "", "", "", "n", "", "n"];
    let (outcomes, console) = run(&module, None, &answers);

    assert_eq!(
        outcomes,
        vec![ModuleOutcome {
            port: DEMO_PORT.to_string(),
            baud: Some(38400),
            kind: OutcomeKind::Skipped {
                reason: "connection error: Serial port error: /dev/ttyDEMO0: device unplugged"
                    .to_string(),
            },
        }]
    );
    assert_eq!(
        module.commands().last().map(String::as_str),
        Some("AT+NAME=HC-05")
    );
    assert!(console
        .prompts()
        .contains(&"Retry configuration for this module? (Y/n): ".to_string()));
    assert!(console
        .output()
        .iter()
        .any(|line| line.starts_with("Connection error:")));
    assert_eq!(module.open_handles(), 0);
}

#[test]
fn test_write_failure_confirming_at_mode_recovers() {
    // the detection probe goes through, the confirmation `AT` does not
    let module = DemoModule::new(9600).failing_write_after("AT", 1);
    let (outcomes, console) = run(&module, None, &["1", "n", "", "n"]);

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].baud, Some(9600));
    match &outcomes[0].kind {
        OutcomeKind::Skipped { reason } => assert!(reason.starts_with("connection error")),
        other => panic!("expected skip, got {:?}", other),
    }
    assert_eq!(console.prompts()[1], "Retry module? (Y/n): ");
    assert_eq!(module.open_handles(), 0);
}

#[test]
fn test_write_failure_querying_config_recovers() {
    let module = DemoModule::new(19200).failing_write("AT+ROLE?");
    let (outcomes, console) = run(&module, None, &["1", "n", "", "n"]);

    assert!(matches!(outcomes[0].kind, OutcomeKind::Skipped { .. }));
    assert_eq!(module.commands().last().map(String::as_str), Some("AT+NAME?"));
    assert!(!console
        .output()
        .iter()
        .any(|line| line.starts_with("Current module name")));
    assert_eq!(console.prompts()[1], "Retry module? (Y/n): ");
    assert_eq!(module.open_handles(), 0);
}

#[test]
fn test_failed_verification_still_configured() {
    // the first name query is the pre-change readout
    let module = DemoModule::new(38400).failing_write_after("AT+NAME?", 1);
    let answers = ["1", "", "", "", "", "", "", "n"];
    let (outcomes, console) = run(&module, None, &answers);

    assert_eq!(
        outcomes[0].kind,
        OutcomeKind::Configured {
            config: ModuleConfig::default(),
            verification: None,
        }
    );
    assert!(console
        .output()
        .iter()
        .any(|line| line.starts_with("Verification failed:")));
    assert!(console
        .output()
        .contains(&"Configuration applied successfully.".to_string()));
    assert_eq!(module.open_handles(), 0);
}
