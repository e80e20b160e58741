use token_elevation_rs::{ProcessToken, Sid, logon_session_sid};

fn main() -> anyhow::Result<()> {
    let token = ProcessToken::open_current()?;

    let logon_sid = logon_session_sid(&token)?;
    println!("logon session SID: {}", logon_sid);
    println!("current user SID: {}", Sid::from_current_user()?);

    Ok(())
}
