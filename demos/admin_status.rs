use token_elevation_rs::{admin_status, is_process_admin};

fn main() {
    let status = admin_status();

    println!("admin status: {:?}", status);
    println!("is admin now: {}", is_process_admin());
    println!("could elevate: {}", status.could_elevate());
}
