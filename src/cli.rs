//! Interactive console front end. Each command maps onto one of the original
//! client's screens; the library layers below do all the work.

use std::collections::HashSet;
use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::api::errors::ApiError;
use crate::attempt::{run_session, AttemptSession, SessionCommand, SessionError, SessionSignal};
use crate::attempt::countdown::format_remaining;
use crate::core::state::AppState;
use crate::schemas::exam::Exam;
use crate::schemas::user::Role;
use crate::services::exam_filter::{filter_exams, sort_exams, ExamFilter, SortKey};
use crate::services::results::paginate;
use crate::session::guards;

const RESULTS_PAGE_SIZE: usize = 20;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Testly console. Type 'help' for commands.");
    if let Some(user) = state.session().current() {
        println!("Signed in as {} ({}).", user.display_name(), user.role.as_str());
    }

    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            continue;
        };

        match command {
            "help" => help(),
            "quit" | "exit" => break,
            "login" => login(&state, args).await,
            "logout" => state.auth().sign_out().await,
            "whoami" => whoami(&state),
            "register" => register(&state, args).await,
            "confirm-email" => confirm_email(&state, args).await,
            "resend-confirmation" => resend_confirmation(&state, args).await,
            "request-reset" => request_reset(&state, args).await,
            "verify-reset" => verify_reset(&state, args).await,
            "guest" => guest(&state, args),
            "teachers" => teachers(&state).await,
            "select-teachers" => select_teachers(&state, args).await,
            "exams" => exams(&state, args).await,
            "bookmark" => bookmark(&state, args),
            "take" => take(&state, &mut lines, args).await,
            "results" => results(&state, args).await,
            "result" => result(&state, args).await,
            "my-exams" => my_exams(&state).await,
            "my-attempts" => my_attempts(&state).await,
            "exam-attempts" => exam_attempts(&state, args).await,
            "delete-exam" => delete_exam(&state, &mut lines, args).await,
            other => println!("Unknown command '{other}'. Type 'help' for commands."),
        }
    }

    Ok(())
}

fn prompt() {
    print!("testly> ");
    let _ = std::io::stdout().flush();
}

fn help() {
    println!(
        "\
Commands:
  login <email> <password>          sign in
  logout                            sign out
  whoami                            show the current user
  register <username> <email> <password> [teacher]
  confirm-email <token>             confirm a registration email
  resend-confirmation <email>
  request-reset <email>             start a password reset
  verify-reset <code> <new> <confirm>
  guest <on|off>                    toggle guest browsing
  teachers                          list confirmed teachers
  select-teachers <id>...           set your teachers
  exams <teacherId> [all|recent|popular|bookmarked|completed] [sort=title|created|duration[:desc]] [search...]
  bookmark <examId>                 toggle a bookmark
  take <examId>                     start a timed attempt
  results [page]                    your past attempts
  result <attemptId>                one attempt in detail
  my-exams                          exams you own (teachers)
  my-attempts                       attempts against your exams (teachers)
  exam-attempts <examId>            attempts against one of your exams
  delete-exam <examId>              delete an exam you own (asks first)
  quit"
    );
}

async fn login(state: &AppState, args: &[&str]) {
    let [email, password] = args else {
        println!("Usage: login <email> <password>");
        return;
    };
    match state.auth().sign_in(email, password).await {
        Ok(user) => println!("Signed in as {} ({}).", user.display_name(), user.role.as_str()),
        Err(err) => println!("{}", err.user_message()),
    }
}

fn whoami(state: &AppState) {
    match state.session().current() {
        Some(user) => {
            println!("{} <{}> role={}", user.display_name(), user.email, user.role.as_str());
        }
        None if state.session().is_guest_mode() => println!("Browsing as guest."),
        None => println!("Not signed in."),
    }
}

async fn register(state: &AppState, args: &[&str]) {
    let (core, teacher) = match args {
        [username, email, password] => ((username, email, password), false),
        [username, email, password, kind] if *kind == "teacher" => {
            ((username, email, password), true)
        }
        _ => {
            println!("Usage: register <username> <email> <password> [teacher]");
            return;
        }
    };

    let registration = crate::api::auth::Registration {
        username: core.0.to_string(),
        email: core.1.to_string(),
        password: core.2.to_string(),
    };
    let outcome = if teacher {
        state.auth().register_teacher(&registration).await
    } else {
        state.auth().register(&registration).await
    };
    match outcome {
        Ok(message) => println!("Registered: {message}. Check your email to confirm."),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn confirm_email(state: &AppState, args: &[&str]) {
    let [token] = args else {
        println!("Usage: confirm-email <token>");
        return;
    };
    match state.auth().confirm_email(token).await {
        Ok(message) => println!("{message}"),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn resend_confirmation(state: &AppState, args: &[&str]) {
    let [email] = args else {
        println!("Usage: resend-confirmation <email>");
        return;
    };
    match state.auth().resend_confirmation(email).await {
        Ok(message) => println!("{message}"),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn request_reset(state: &AppState, args: &[&str]) {
    let [email] = args else {
        println!("Usage: request-reset <email>");
        return;
    };
    match state.auth().request_password_reset(email).await {
        Ok(message) => println!("{message}"),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn verify_reset(state: &AppState, args: &[&str]) {
    let [code, new_password, confirm] = args else {
        println!("Usage: verify-reset <code> <new> <confirm>");
        return;
    };
    match state.auth().verify_password_reset(code, new_password, confirm).await {
        Ok(message) => println!("{message}"),
        Err(err) => println!("{}", err.user_message()),
    }
}

fn guest(state: &AppState, args: &[&str]) {
    match args {
        ["on"] => {
            state.session().set_guest_mode(true);
            println!("Guest mode on.");
        }
        ["off"] => {
            state.session().set_guest_mode(false);
            println!("Guest mode off.");
        }
        _ => println!("Usage: guest <on|off>"),
    }
}

async fn teachers(state: &AppState) {
    let teachers = state.auth().confirmed_teachers().await;
    if teachers.is_empty() {
        println!("No confirmed teachers available.");
        return;
    }
    for teacher in teachers {
        println!("{}  {}", teacher.id, teacher.display_name());
    }
}

async fn select_teachers(state: &AppState, args: &[&str]) {
    if args.is_empty() {
        println!("Usage: select-teachers <id>...");
        return;
    }
    let ids: Vec<String> = args.iter().map(|id| id.to_string()).collect();
    match state.auth().update_selected_teachers(&ids).await {
        Ok(()) => println!("Selected {} teacher(s).", ids.len()),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn exams(state: &AppState, args: &[&str]) {
    let Some((&teacher_id, rest)) = args.split_first() else {
        println!("Usage: exams <teacherId> [all|recent|popular|bookmarked|completed] [search...]");
        return;
    };

    let (filter, search_parts) = match rest.split_first() {
        Some((&"all", tail)) => (ExamFilter::All, tail),
        Some((&"recent", tail)) => (ExamFilter::Recent, tail),
        Some((&"popular", tail)) => (ExamFilter::Popular, tail),
        Some((&"bookmarked", tail)) => (ExamFilter::Bookmarked, tail),
        Some((&"completed", tail)) => (ExamFilter::Completed, tail),
        _ => (ExamFilter::All, rest),
    };
    let (sort, search_parts) = match search_parts.split_first() {
        Some((&token, tail)) if token.starts_with("sort=") => (parse_sort(token), tail),
        _ => (None, search_parts),
    };
    let search = search_parts.join(" ");

    let mut all = state.exams().list_by_teacher(teacher_id).await;
    state.exams().backfill_question_counts(&mut all).await;
    let bookmarked = state.bookmarks().ids();
    let completed = if filter == ExamFilter::Completed {
        state.results().completed_exam_ids().await
    } else {
        HashSet::new()
    };

    let mut visible = filter_exams(&all, &search, filter, &bookmarked, &completed);
    if let Some((key, ascending)) = sort {
        sort_exams(&mut visible, key, ascending);
    }
    if visible.is_empty() {
        println!("No exams match.");
        return;
    }
    for exam in &visible {
        print_exam_line(exam, bookmarked.contains(&exam.id));
    }
}

fn parse_sort(token: &str) -> Option<(SortKey, bool)> {
    let raw = token.strip_prefix("sort=")?;
    let (key, ascending) = match raw.strip_suffix(":desc") {
        Some(key) => (key, false),
        None => (raw, true),
    };
    let key = match key {
        "title" => SortKey::Title,
        "created" => SortKey::Created,
        "duration" => SortKey::Duration,
        _ => return None,
    };
    Some((key, ascending))
}

fn print_exam_line(exam: &Exam, bookmarked: bool) {
    let marker = if bookmarked { "*" } else { " " };
    println!(
        "{marker} {}  {}  {} min, pass {}%, {} question(s)",
        exam.id,
        exam.title,
        exam.duration_minutes,
        exam.passing_score,
        exam.questions.len()
    );
}

fn bookmark(state: &AppState, args: &[&str]) {
    let [exam_id] = args else {
        println!("Usage: bookmark <examId>");
        return;
    };
    if state.bookmarks().toggle(exam_id) {
        println!("Bookmarked {exam_id}.");
    } else {
        println!("Removed bookmark for {exam_id}.");
    }
}

async fn take(state: &AppState, lines: &mut Lines<BufReader<Stdin>>, args: &[&str]) {
    // No exam id: back to the list, never an error screen.
    let [exam_id] = args else {
        println!("Pick an exam first: exams <teacherId>, then take <examId>.");
        return;
    };

    if guards::require_authenticated(state.session()).is_err() {
        println!("Please sign in to take an exam (login <email> <password>).");
        return;
    }

    let session =
        match AttemptSession::begin(state.exams(), state.attempts().clone(), exam_id).await {
            Ok(session) => session,
            Err(SessionError::ExamNotFound) => {
                println!("Exam {exam_id} was not found.");
                return;
            }
            Err(SessionError::EmptyExam) => {
                println!("This exam has no questions and cannot be taken.");
                return;
            }
            Err(SessionError::Load(err)) => {
                println!("Failed to load exam. {}", err.user_message());
                return;
            }
            Err(SessionError::Start(err)) => {
                println!("Failed to start the attempt. {}", err.user_message());
                return;
            }
        };

    print_paper(&session);

    let (commands_tx, commands_rx) = mpsc::channel(16);
    let (signals_tx, mut signals_rx) = mpsc::channel(32);
    let runner = tokio::spawn(run_session(session, commands_rx, signals_tx));

    loop {
        prompt();
        tokio::select! {
            line = lines.next_line() => {
                let command = match line {
                    Ok(Some(text)) => parse_attempt_command(&text),
                    Ok(None) | Err(_) => Some(SessionCommand::Quit),
                };
                match command {
                    Some(command) => {
                        let quitting = command == SessionCommand::Quit;
                        if commands_tx.send(command).await.is_err() || quitting {
                            break;
                        }
                    }
                    None => println!("In an attempt: a <question> <option> | submit | quit"),
                }
            }
            signal = signals_rx.recv() => match signal {
                Some(SessionSignal::Tick { remaining }) => {
                    if remaining % 60 == 0 || remaining <= 10 {
                        println!("{} remaining", format_remaining(remaining));
                    }
                }
                Some(SessionSignal::Progress { answered, total, percent, complete }) => {
                    if complete {
                        println!("Answered {answered}/{total} — ready to submit.");
                    } else {
                        println!("Answered {answered}/{total} ({percent:.0}%).");
                    }
                }
                Some(SessionSignal::SubmissionFailed { message }) => {
                    println!("Submission failed: {message} Type 'submit' to retry.");
                }
                Some(SessionSignal::Completed(attempt)) => {
                    print_attempt(&attempt);
                }
                None => break,
            },
        }
    }

    match runner.await {
        Ok(Some(_)) => {}
        Ok(None) => println!("Attempt abandoned."),
        Err(err) => tracing::error!(error = %err, "Attempt session task failed"),
    }
}

fn parse_attempt_command(line: &str) -> Option<SessionCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["a", question, option] => {
            let question: usize = question.parse().ok()?;
            let option: usize = option.parse().ok()?;
            // Displayed 1-based, stored 0-based.
            if question == 0 || option == 0 {
                return None;
            }
            Some(SessionCommand::SelectAnswer { question: question - 1, option: option as i32 - 1 })
        }
        ["submit"] => Some(SessionCommand::Submit),
        ["quit"] => Some(SessionCommand::Quit),
        [] => None,
        _ => None,
    }
}

fn print_paper(session: &AttemptSession) {
    let exam = session.exam();
    println!(
        "\n{} — {} min, pass {}%. Answer with: a <question> <option>",
        exam.title, exam.duration_minutes, exam.passing_score
    );
    for (i, question) in exam.questions.iter().enumerate() {
        println!("{}. {}", i + 1, question.text);
        for (j, option) in question.options.iter().enumerate() {
            println!("   {}) {}", j + 1, option);
        }
    }
}

fn print_attempt(attempt: &crate::schemas::attempt::Attempt) {
    let verdict = if attempt.passed { "PASSED" } else { "FAILED" };
    println!(
        "Attempt {}: {:.1}/{:.1} points ({:.0}%) — {}",
        attempt.id,
        attempt.score,
        attempt.total_points,
        attempt.percentage(),
        verdict
    );
}

async fn results(state: &AppState, args: &[&str]) {
    let page: usize = args.first().and_then(|raw| raw.parse().ok()).unwrap_or(1).max(1);

    let rows = state.results().load().await;
    if rows.is_empty() {
        println!("No results yet.");
        return;
    }

    let window = paginate(&rows, (page - 1) * RESULTS_PAGE_SIZE, RESULTS_PAGE_SIZE);
    for row in &window.items {
        let title = row.exam_title.as_deref().unwrap_or("Unknown exam");
        let verdict = if row.attempt.passed { "passed" } else { "failed" };
        println!(
            "{}  {}  {:.0}%  {}",
            row.attempt.id,
            title,
            row.attempt.percentage(),
            verdict
        );
    }
    println!(
        "Page {page} ({} of {} result(s)). 'results {}' for more.",
        window.items.len(),
        window.total_count,
        page + 1
    );
}

async fn result(state: &AppState, args: &[&str]) {
    let [attempt_id] = args else {
        println!("Usage: result <attemptId>");
        return;
    };
    match state.attempts().fetch(attempt_id).await {
        Ok(attempt) => {
            print_attempt(&attempt);
            let answered = attempt.answers.iter().filter(|a| a.is_answered()).count();
            println!("{} of {} question(s) answered.", answered, attempt.answers.len());
        }
        Err(ApiError::NotFound(_)) => println!("Attempt {attempt_id} was not found."),
        Err(err) => println!("{}", err.user_message()),
    }
}

async fn my_exams(state: &AppState) {
    if let Err(err) = guards::require_role(state.session(), Role::Teacher) {
        println!("{}", err.user_message());
        return;
    }
    let mut exams = state.exams().own_exams().await;
    if exams.is_empty() {
        println!("You have no exams yet.");
        return;
    }
    sort_exams(&mut exams, SortKey::Title, true);
    for exam in &exams {
        print_exam_line(exam, false);
    }
}

async fn my_attempts(state: &AppState) {
    if let Err(err) = guards::require_role(state.session(), Role::Teacher) {
        println!("{}", err.user_message());
        return;
    }
    let attempts = state.exams().own_exam_attempts().await;
    if attempts.is_empty() {
        println!("No attempts against your exams yet.");
        return;
    }
    for attempt in &attempts {
        println!(
            "{}  exam {}  {:.0}%  {}",
            attempt.id,
            attempt.exam_id,
            attempt.percentage(),
            if attempt.passed { "passed" } else { "failed" }
        );
    }
}

async fn exam_attempts(state: &AppState, args: &[&str]) {
    let [exam_id] = args else {
        println!("Usage: exam-attempts <examId>");
        return;
    };
    if let Err(err) = guards::require_role(state.session(), Role::Teacher) {
        println!("{}", err.user_message());
        return;
    }
    let attempts = state.exams().attempts_for_exam(exam_id).await;
    if attempts.is_empty() {
        println!("No attempts for exam {exam_id} yet.");
        return;
    }
    for attempt in &attempts {
        println!(
            "{}  {:.0}%  {}",
            attempt.id,
            attempt.percentage(),
            if attempt.passed { "passed" } else { "failed" }
        );
    }
}

async fn delete_exam(state: &AppState, lines: &mut Lines<BufReader<Stdin>>, args: &[&str]) {
    let [exam_id] = args else {
        println!("Usage: delete-exam <examId>");
        return;
    };
    if let Err(err) = guards::require_role(state.session(), Role::Teacher) {
        println!("{}", err.user_message());
        return;
    }

    print!("Delete exam {exam_id}? This cannot be undone. [y/N] ");
    let _ = std::io::stdout().flush();
    let confirmed = matches!(lines.next_line().await, Ok(Some(answer)) if answer.trim() == "y");
    if !confirmed {
        println!("Kept {exam_id}.");
        return;
    }

    match state.exams().delete(exam_id).await {
        Ok(()) => println!("Deleted {exam_id}."),
        Err(ApiError::NotFound(_)) => println!("Exam {exam_id} was not found."),
        Err(err) => println!("{}", err.user_message()),
    }
}
