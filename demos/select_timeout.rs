use std::time::Duration;

use golite::channel::{timeout_channel, BufferedChannel, Channel, Selectable};
use golite::{select, task};

/// A worker that produces values on `work`, racing a deadline on
/// `deadline`. Whichever is ready first wins the select; once the
/// deadline fires the loop stops.
fn main() {
    env_logger::init();

    let work = BufferedChannel::<u32>::new(8).unwrap();
    let deadline = timeout_channel(Duration::from_millis(250));

    let producer = {
        let work = work.clone();
        task::spawn(move || {
            let mut n = 0;
            loop {
                if task::is_cancelled() {
                    break;
                }
                n += 1;
                if work.put(n).is_err() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Ok(())
        })
    };

    loop {
        let cases: [&dyn Selectable; 2] = [&*work, &*deadline];
        let (idx, value) = select(&cases);
        if idx == 0 {
            let n = *value.downcast::<u32>().unwrap();
            println!("received {n}");
        } else {
            println!("deadline reached, stopping");
            break;
        }
    }

    producer.cancel();
    producer.join().expect("producer task failed");
}
