fn main() {
    wfog::run();
}
