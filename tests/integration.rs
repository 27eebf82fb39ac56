use std::{cell::RefCell, path::Path, rc::Rc, str::from_utf8, sync::Arc};

use teller::{
    bin_utils::{Console, EnrollError, EnrollSummary, Enrollment, SessionEnd},
    journal::TransactionLog,
    store::{AccountStore, SqliteAccountStore},
    teller::{SessionState, Teller},
};

const ACCOUNTS: &str = include_str!("accounts.csv");

async fn enrolled_teller(log: &Path) -> Teller<SqliteAccountStore> {
    let store = SqliteAccountStore::in_memory().await.unwrap();
    let teller = Teller::new(Arc::new(store), TransactionLog::new(log));

    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let enrollment = Enrollment {
        input: ACCOUNTS.as_bytes(),
        error_printer: Box::new(move |line, err: EnrollError| {
            sink.borrow_mut().push((line, err.to_string()))
        }),
    };
    let summary = enrollment.run(&teller).await.unwrap();
    assert_eq!(
        summary,
        EnrollSummary {
            enrolled: 2,
            skipped: 2
        }
    );
    let errors = errors.borrow();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], (4, "Account #1 already exists".to_owned()));
    assert_eq!(errors[1].0, 5);
    teller
}

async fn run_console(teller: &mut Teller<SqliteAccountStore>, input: &str) -> (SessionEnd, String) {
    let mut output = Vec::new();
    let console = Console {
        input: input.as_bytes(),
        output: &mut output,
    };
    let end = console.run(teller).await.unwrap();
    (end, from_utf8(&output).unwrap().to_owned())
}

#[tokio::test]
async fn banking_session() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("transaction_log.txt");
    let mut teller = enrolled_teller(&log_path).await;

    let input = "\
123-45-6789
pw1
b
1
W
1
150.00
W
1
40.00
D
1
-5.00
D
1
25.50
B
1
N
Grace
Hopper
555-12-3456
Arlington
555-0123
grace@example.com
navy
1
0
N
Grace
Hopper
555-12-3456
Arlington
555-0123
grace@example.com
navy
3
ten
X
D
42
1
Q
";
    let (end, output) = run_console(&mut teller, input).await;
    assert_eq!(end, SessionEnd::Quit);
    assert_eq!(teller.state(), &SessionState::Terminated);

    let expected = [
        "Login successful!",
        "Account balance: $100.00",
        "Error: Insufficient funds for withdrawal of 150.00 from account #1 (balance 100.00)",
        "Successfully withdrew $40.00 from account #1",
        "Error: Deposit amount must be greater than zero, got -5.00",
        "Successfully deposited $25.50 to account #1",
        "Account balance: $85.50",
        "Error: Account #1 already exists",
        "Error: `ten` is not a valid amount",
        "Invalid selection `X`",
        "Error: Account #42 not found",
        "Goodbye.",
    ];
    let mut rest = output.as_str();
    for message in expected {
        let at = rest
            .find(message)
            .unwrap_or_else(|| panic!("`{message}` missing from output:\n{output}"));
        rest = &rest[at + message.len()..];
    }

    let stored = teller.ledger().store().fetch(1).await.unwrap().unwrap();
    assert_eq!(stored.balance.to_string(), "85.50");
    assert!(!teller.ledger().store().exists(3).await.unwrap());

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        [
            "Created account #1",
            "Created account #2",
            "Withdrew $40.00 from account #1, balance $60.00",
            "Deposited $25.50 to account #1, balance $85.50",
        ]
    );
}

#[tokio::test]
async fn wrong_password_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut teller = enrolled_teller(&dir.path().join("log.txt")).await;

    let (end, output) = run_console(&mut teller, "123-45-6789\npw2\nB\n1\nQ\n").await;
    assert_eq!(end, SessionEnd::Denied);
    assert!(output.contains("Authentication failed. Exiting."));
    assert!(!output.contains("Menu"));
    assert_eq!(teller.state(), &SessionState::Terminated);
}

#[tokio::test]
async fn store_outage_at_login_denies_access() {
    let dir = tempfile::tempdir().unwrap();
    let mut teller = enrolled_teller(&dir.path().join("log.txt")).await;
    teller.ledger().store().pool().close().await;

    let (end, output) = run_console(&mut teller, "123-45-6789\npw1\n").await;
    assert_eq!(end, SessionEnd::StoreUnavailable);
    assert!(output.contains("Account store unavailable. Exiting."));
}

#[tokio::test]
async fn end_of_input_quits() {
    let dir = tempfile::tempdir().unwrap();
    let mut teller = enrolled_teller(&dir.path().join("log.txt")).await;

    let (end, output) = run_console(&mut teller, "987-65-4321\nengine\n").await;
    assert_eq!(end, SessionEnd::Quit);
    assert!(output.contains("Login successful!"));
    assert!(output.ends_with("Goodbye.\n"));
}
